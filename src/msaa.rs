//! Multisampled offscreen target resolved into the presented image.

use crate::{
    AttachmentHeap, AttachmentHeapDesc, CommandBuffer, Device, Error, Format, HeapType, Image,
    ImageDesc, RenderTarget, ResourceStates, TargetSize,
    DXGI_FORMAT_D24_UNORM_S8_UINT, RESOURCE_FLAG_DEPTH_STENCIL, RESOURCE_FLAG_RENDER_TARGET,
    RESOURCE_STATE_DEPTH_WRITE, RESOURCE_STATE_PRESENT, RESOURCE_STATE_RENDER_TARGET,
    RESOURCE_STATE_RESOLVE_DST, RESOURCE_STATE_RESOLVE_SRC, SWAPCHAIN_FORMAT,
};
use log::info;

pub struct MsaaTarget {
    device: Device,
    samples: u32,
    clear_color: [f32; 4],
    views: AttachmentHeap,
    size: TargetSize,
    color: Option<Image>,
    depth: Option<Image>,
    // Replaced attachments may still be referenced by frames in flight.
    retired: Vec<Image>,
    cmd_buf: Option<CommandBuffer>,
    output: Option<d3d12::Resource>,
}

impl MsaaTarget {
    pub fn new(device: &Device, samples: u32, clear_color: [f32; 4]) -> Result<Self, Error> {
        let views = device.create_attachment_heap(&AttachmentHeapDesc {
            num_color: 1,
            num_depth: 1,
        })?;

        Ok(MsaaTarget {
            device: device.clone(),
            samples,
            clear_color,
            views,
            size: TargetSize::default(),
            color: None,
            depth: None,
            retired: Vec::new(),
            cmd_buf: None,
            output: None,
        })
    }

    /// Record the next frame into `cmd_buf`, resolving into `output` which is in present state.
    pub fn bind(&mut self, cmd_buf: &CommandBuffer, output: &Image) {
        self.cmd_buf = Some(cmd_buf.clone());
        self.output = Some(*output.resource());
    }

    /// Free attachments replaced by earlier resizes. The GPU must be idle.
    pub fn release_retired(&mut self) {
        for image in self.retired.drain(..) {
            unsafe { image.destroy() };
        }
    }

    fn create_attachment(
        &self,
        format: Format,
        flags: u32,
        state: ResourceStates,
    ) -> Result<Image, Error> {
        self.device.create_image_committed(
            &ImageDesc {
                flags,
                format,
                width: self.size.width(),
                height: self.size.height(),
                samples: self.samples,
            },
            HeapType::Device,
            state,
        )
    }
}

impl RenderTarget for MsaaTarget {
    fn ensure_size(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if !self.size.update(width, height) {
            return Ok(());
        }
        info!("resize: {} x {}", width, height);

        self.retired.extend(self.color.take());
        self.retired.extend(self.depth.take());

        let color = self.create_attachment(
            SWAPCHAIN_FORMAT,
            RESOURCE_FLAG_RENDER_TARGET,
            RESOURCE_STATE_RENDER_TARGET,
        )?;
        self.device.create_color_view(&color, self.views.color_view(0));
        self.color = Some(color);

        let depth = self.create_attachment(
            DXGI_FORMAT_D24_UNORM_S8_UINT,
            RESOURCE_FLAG_DEPTH_STENCIL,
            RESOURCE_STATE_DEPTH_WRITE,
        )?;
        self.device.create_depth_view(&depth, self.views.depth_view(0));
        self.depth = Some(depth);

        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), Error> {
        let (cmd_buf, output, color) = match (&self.cmd_buf, self.output, &self.color) {
            (Some(cmd_buf), Some(output), Some(color)) => (cmd_buf, output, color),
            _ => {
                return Err(Error::Device {
                    cause: "render target used before binding and sizing".into(),
                })
            }
        };
        let color_view = self.views.color_view(0);
        let depth_view = self.views.depth_view(0);

        cmd_buf.set_render_target(color_view, depth_view);
        cmd_buf.clear_color(color_view, self.clear_color);
        cmd_buf.clear_depth_stencil(depth_view, 1.0, 0);

        cmd_buf.resource_barrier(&[
            d3d12::ResourceBarrier::transition(
                *color.resource(),
                0,
                RESOURCE_STATE_RENDER_TARGET,
                RESOURCE_STATE_RESOLVE_SRC,
                0,
            ),
            d3d12::ResourceBarrier::transition(
                output,
                0,
                RESOURCE_STATE_PRESENT,
                RESOURCE_STATE_RESOLVE_DST,
                0,
            ),
        ]);
        cmd_buf.resolve_image(color, &output, SWAPCHAIN_FORMAT);
        cmd_buf.resource_barrier(&[
            d3d12::ResourceBarrier::transition(
                *color.resource(),
                0,
                RESOURCE_STATE_RESOLVE_SRC,
                RESOURCE_STATE_RENDER_TARGET,
                0,
            ),
            d3d12::ResourceBarrier::transition(
                output,
                0,
                RESOURCE_STATE_RESOLVE_DST,
                RESOURCE_STATE_PRESENT,
                0,
            ),
        ]);

        Ok(())
    }
}

impl Drop for MsaaTarget {
    fn drop(&mut self) {
        unsafe {
            for image in self
                .retired
                .iter()
                .chain(self.color.iter())
                .chain(self.depth.iter())
            {
                image.destroy();
            }
            self.views.destroy();
        }
    }
}
