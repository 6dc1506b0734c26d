use crate::Error;

/// Offscreen surface a frame renders into.
pub trait RenderTarget {
    /// Idempotent, storage is only reallocated when the extent changes.
    fn ensure_size(&mut self, width: u32, height: u32) -> Result<(), Error>;

    /// Record the frame's rendering commands.
    fn render_frame(&mut self) -> Result<(), Error>;
}

/// Tracks the extent render target storage was last allocated for.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    /// Returns `true` if storage has to be reallocated for the new extent.
    ///
    /// Empty extents (minimized windows) keep the previous storage.
    pub fn update(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Nothing allocated yet.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reallocates_only_on_change() {
        let mut size = TargetSize::default();
        assert!(size.is_empty());
        assert!(size.update(100, 100));
        assert!(!size.update(100, 100));
        assert!(size.update(200, 100));
        assert_eq!((size.width(), size.height()), (200, 100));
    }

    #[test]
    fn ignores_empty_extent() {
        let mut size = TargetSize::default();
        assert!(!size.update(0, 100));
        assert!(size.is_empty());
        size.update(64, 64);
        assert!(!size.update(64, 0));
        assert_eq!((size.width(), size.height()), (64, 64));
    }
}
