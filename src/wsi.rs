//! Window System Interface
//!
//! Currently only supporting winit.

use crate::{device::check_hr, Device, Error, Image, Queue};
use winapi::shared::{dxgiformat, dxgitype};
use winit::{platform::windows::WindowExtWindows, window::Window};

pub const SWAPCHAIN_FORMAT: dxgiformat::DXGI_FORMAT = dxgiformat::DXGI_FORMAT_R8G8B8A8_UNORM;

pub struct Swapchain {
    swapchain: d3d12::SwapChain3,
    buffer_count: u32,
    render_targets: Vec<Image>,
}

impl Device {
    pub fn create_swapchain(
        &self,
        present_queue: &Queue,
        window: &Window,
        buffer_count: u32,
    ) -> Result<Swapchain, Error> {
        let size = window.inner_size();
        let desc = d3d12::SwapchainDesc {
            width: size.width,
            height: size.height,
            format: SWAPCHAIN_FORMAT,
            stereo: false,
            sample: d3d12::SampleDesc {
                count: 1,
                quality: 0,
            },
            buffer_usage: dxgitype::DXGI_USAGE_RENDER_TARGET_OUTPUT,
            buffer_count,
            scaling: d3d12::Scaling::Stretch,
            swap_effect: d3d12::SwapEffect::FlipDiscard,
            alpha_mode: d3d12::AlphaMode::Ignore,
            flags: 0,
        };
        let (swapchain1, hr) = self.factory.as_factory2().create_swapchain_for_hwnd(
            present_queue.queue,
            window.hwnd() as _,
            &desc,
        );
        check_hr(hr, "create swapchain")?;

        let (swapchain, hr) = unsafe { swapchain1.cast() };
        unsafe { swapchain1.destroy() };
        check_hr(hr, "query swapchain3")?;

        let mut swapchain = Swapchain {
            swapchain,
            buffer_count,
            render_targets: Vec::new(),
        };
        swapchain.fetch_buffers()?;
        Ok(swapchain)
    }
}

impl Swapchain {
    pub fn render_targets(&self) -> &[Image] {
        &self.render_targets
    }

    pub fn acquire(&self) -> usize {
        self.swapchain.get_current_back_buffer_index() as _
    }

    pub fn present(&self) -> Result<(), Error> {
        let hr = unsafe { self.swapchain.as_swapchain0().Present(1, 0) };
        check_hr(hr, "present")
    }

    /// Resize the back buffers to the new window extent.
    ///
    /// The GPU must be done with every back buffer. Zero-sized (minimized) extents are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        self.release_buffers();
        let hr = unsafe {
            self.swapchain
                .ResizeBuffers(self.buffer_count, width, height, SWAPCHAIN_FORMAT, 0)
        };
        check_hr(hr, "resize swapchain")?;
        self.fetch_buffers()
    }

    fn fetch_buffers(&mut self) -> Result<(), Error> {
        for i in 0..self.buffer_count {
            let (image, hr) = self.swapchain.as_swapchain0().get_buffer(i);
            check_hr(hr, "get swapchain buffer")?;
            self.render_targets.push(Image(image));
        }
        Ok(())
    }

    fn release_buffers(&mut self) {
        for image in self.render_targets.drain(..) {
            unsafe { image.destroy() };
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.release_buffers();
        unsafe { self.swapchain.destroy() };
    }
}
