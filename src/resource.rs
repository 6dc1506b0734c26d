use crate::{device::check_hr, Device, Error};

pub use winapi::um::d3d12::{
    D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL as RESOURCE_FLAG_DEPTH_STENCIL,
    D3D12_RESOURCE_FLAG_ALLOW_RENDER_TARGET as RESOURCE_FLAG_RENDER_TARGET,
    D3D12_RESOURCE_STATES as ResourceStates,
    D3D12_RESOURCE_STATE_COPY_DEST as RESOURCES_STATE_TRANSFER_DST,
    D3D12_RESOURCE_STATE_DEPTH_WRITE as RESOURCE_STATE_DEPTH_WRITE,
    D3D12_RESOURCE_STATE_PRESENT as RESOURCE_STATE_PRESENT,
    D3D12_RESOURCE_STATE_RENDER_TARGET as RESOURCE_STATE_RENDER_TARGET,
    D3D12_RESOURCE_STATE_RESOLVE_DEST as RESOURCE_STATE_RESOLVE_DST,
    D3D12_RESOURCE_STATE_RESOLVE_SOURCE as RESOURCE_STATE_RESOLVE_SRC,
};

pub use winapi::shared::dxgiformat::DXGI_FORMAT as Format;
pub use winapi::shared::dxgiformat::*;

use std::ptr;
use winapi::shared::dxgitype::DXGI_SAMPLE_DESC;
use winapi::um::d3d12::*;
use winapi::Interface;

/// Linear memory, only used as a readback target for resolved query data.
pub struct Buffer(pub(crate) d3d12::Resource);

impl Buffer {
    pub fn resource(&self) -> &d3d12::Resource {
        &self.0
    }

    /// Read back `data.len()` bytes starting at `offset`. The buffer must live in a readback heap.
    pub fn copy_to_host(&self, offset: usize, data: &mut [u8]) -> Result<(), Error> {
        let read = D3D12_RANGE {
            Begin: offset as _,
            End: (offset + data.len()) as _,
        };
        let written = D3D12_RANGE { Begin: 0, End: 0 };
        unsafe {
            let mut mapped = ptr::null_mut();
            check_hr(self.0.Map(0, &read, &mut mapped), "map buffer")?;
            ptr::copy_nonoverlapping(
                (mapped as *const u8).add(offset),
                data.as_mut_ptr(),
                data.len(),
            );
            self.0.Unmap(0, &written);
        }
        Ok(())
    }

    pub(crate) unsafe fn destroy(&self) {
        self.0.destroy();
    }
}

/// 2D texture, either a swapchain back buffer or a multisampled attachment.
pub struct Image(pub(crate) d3d12::Resource);

impl Image {
    pub fn resource(&self) -> &d3d12::Resource {
        &self.0
    }

    pub(crate) unsafe fn destroy(&self) {
        self.0.destroy();
    }
}

#[derive(Debug, Copy, Clone)]
pub enum HeapType {
    Device,
    Readback,
}

impl HeapType {
    fn as_d3d12(&self) -> u32 {
        match self {
            HeapType::Device => D3D12_HEAP_TYPE_DEFAULT,
            HeapType::Readback => D3D12_HEAP_TYPE_READBACK,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageDesc {
    pub flags: u32,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
}

#[derive(Debug, Clone)]
pub struct BufferDesc {
    pub size: u64,
}

impl Device {
    pub fn create_image_committed(
        &self,
        desc: &ImageDesc,
        heap: HeapType,
        initial: ResourceStates,
    ) -> Result<Image, Error> {
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Alignment: 0,
            Width: desc.width as _,
            Height: desc.height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: desc.format,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.samples,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: desc.flags,
        };

        self.create_committed(&desc, heap, initial, "create image")
            .map(Image)
    }

    pub fn create_buffer_committed(
        &self,
        desc: &BufferDesc,
        heap: HeapType,
        initial: ResourceStates,
    ) -> Result<Buffer, Error> {
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
            Alignment: 0,
            Width: desc.size,
            Height: 1,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_UNKNOWN,
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
            Flags: D3D12_RESOURCE_FLAG_NONE,
        };

        self.create_committed(&desc, heap, initial, "create buffer")
            .map(Buffer)
    }

    fn create_committed(
        &self,
        desc: &D3D12_RESOURCE_DESC,
        heap: HeapType,
        initial: ResourceStates,
        what: &'static str,
    ) -> Result<d3d12::Resource, Error> {
        let heap_properties = unsafe { self.GetCustomHeapProperties(0, heap.as_d3d12()) };

        let mut resource = d3d12::Resource::null();
        let hr = unsafe {
            self.CreateCommittedResource(
                &heap_properties,
                D3D12_HEAP_FLAG_ALLOW_ALL_BUFFERS_AND_TEXTURES, // Resource Heap Tier 2 required
                desc,
                initial,
                ptr::null(),
                &ID3D12Resource::uuidof(),
                resource.mut_void(),
            )
        };
        check_hr(hr, what)?;

        Ok(resource)
    }
}
