use crate::{device::check_hr, AttachmentView, Device, Error, Format, Image};
use std::ptr;
use winapi::um::d3d12::{D3D12_CLEAR_FLAG_DEPTH, D3D12_CLEAR_FLAG_STENCIL};

pub use d3d12::CmdListType as CmdBufferTy;

/// Handles are weak pointers, clones record into the same command list.
#[derive(Clone)]
pub struct CommandBuffer {
    allocator: d3d12::CommandAllocator,
    cmd_buffer: d3d12::GraphicsCommandList,
}

impl Device {
    pub fn create_command_buffer(&self, ty: CmdBufferTy) -> Result<CommandBuffer, Error> {
        let (allocator, hr) = self.create_command_allocator(ty);
        check_hr(hr, "create command allocator")?;
        let (cmd_buffer, hr) =
            self.create_graphics_command_list(ty, allocator, d3d12::PipelineState::null(), 0);
        check_hr(hr, "create command list")?;
        cmd_buffer.close();
        Ok(CommandBuffer {
            allocator,
            cmd_buffer,
        })
    }
}

impl CommandBuffer {
    pub fn begin(&self) {
        self.allocator.reset();
        self.cmd_buffer
            .reset(self.allocator, d3d12::PipelineState::null());
    }

    pub fn set_render_target(&self, color: AttachmentView, depth: AttachmentView) {
        unsafe {
            self.cmd_buffer
                .OMSetRenderTargets(1, &color, 0, &depth);
        }
    }

    pub fn clear_color(&self, view: AttachmentView, color: [f32; 4]) {
        unsafe {
            self.cmd_buffer
                .ClearRenderTargetView(view, &color, 0, ptr::null());
        }
    }

    pub fn clear_depth_stencil(&self, view: AttachmentView, depth: f32, stencil: u8) {
        unsafe {
            self.cmd_buffer.ClearDepthStencilView(
                view,
                D3D12_CLEAR_FLAG_DEPTH | D3D12_CLEAR_FLAG_STENCIL,
                depth,
                stencil,
                0,
                ptr::null(),
            );
        }
    }

    /// Resolve a multisampled image into a single sampled one of the same extent.
    pub fn resolve_image(&self, src: &Image, dst: &d3d12::Resource, format: Format) {
        unsafe {
            self.cmd_buffer
                .ResolveSubresource(dst.as_mut_ptr(), 0, src.0.as_mut_ptr(), 0, format);
        }
    }

    pub fn end(&self) {
        self.cmd_buffer.close();
    }

    pub(crate) fn command_list(&self) -> d3d12::CommandList {
        self.cmd_buffer.as_list()
    }
}

impl std::ops::Deref for CommandBuffer {
    type Target = d3d12::GraphicsCommandList;
    fn deref(&self) -> &Self::Target {
        &self.cmd_buffer
    }
}
