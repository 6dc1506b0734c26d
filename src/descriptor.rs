use crate::{device::check_hr, Device, Error, Image};
use std::ptr;

pub use d3d12::CpuDescriptor as AttachmentView;

/// CPU-only descriptor heaps for render target and depth stencil views.
pub struct AttachmentHeap {
    heap_color: d3d12::DescriptorHeap,
    heap_depth: d3d12::DescriptorHeap,

    increment_color: u32,
    increment_depth: u32,

    num_color: usize,
    num_depth: usize,
}

pub struct AttachmentHeapDesc {
    pub num_color: usize,
    pub num_depth: usize,
}

impl AttachmentHeap {
    pub fn color_view(&self, offset: usize) -> AttachmentView {
        assert!(offset < self.num_color);
        let start = self.heap_color.start_cpu_descriptor();
        AttachmentView {
            ptr: start.ptr + offset * self.increment_color as usize,
        }
    }

    pub fn depth_view(&self, offset: usize) -> AttachmentView {
        assert!(offset < self.num_depth);
        let start = self.heap_depth.start_cpu_descriptor();
        AttachmentView {
            ptr: start.ptr + offset * self.increment_depth as usize,
        }
    }

    pub(crate) unsafe fn destroy(&self) {
        self.heap_color.destroy();
        self.heap_depth.destroy();
    }
}

impl Device {
    pub fn create_attachment_heap(
        &self,
        desc: &AttachmentHeapDesc,
    ) -> Result<AttachmentHeap, Error> {
        let (heap_color, hr) = d3d12::Device::create_descriptor_heap(
            self,
            desc.num_color as _,
            d3d12::DescriptorHeapType::Rtv,
            d3d12::DescriptorHeapFlags::empty(),
            0,
        );
        check_hr(hr, "create rtv heap")?;
        let (heap_depth, hr) = d3d12::Device::create_descriptor_heap(
            self,
            desc.num_depth as _,
            d3d12::DescriptorHeapType::Dsv,
            d3d12::DescriptorHeapFlags::empty(),
            0,
        );
        check_hr(hr, "create dsv heap")?;
        let increment_color = self.get_descriptor_increment_size(d3d12::DescriptorHeapType::Rtv);
        let increment_depth = self.get_descriptor_increment_size(d3d12::DescriptorHeapType::Dsv);

        Ok(AttachmentHeap {
            heap_color,
            heap_depth,

            increment_color,
            increment_depth,

            num_color: desc.num_color,
            num_depth: desc.num_depth,
        })
    }

    /// View covering the whole image, format and dimension taken from the resource.
    pub fn create_color_view(&self, image: &Image, view: AttachmentView) {
        unsafe {
            self.CreateRenderTargetView(image.0.as_mut_ptr(), ptr::null(), view);
        }
    }

    pub fn create_depth_view(&self, image: &Image, view: AttachmentView) {
        unsafe {
            self.CreateDepthStencilView(image.0.as_mut_ptr(), ptr::null(), view);
        }
    }
}
