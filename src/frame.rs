//! Per-frame sequencing of query windows around the render work.

use crate::{Error, QueryBackend, QueryRing, RenderTarget, Sample};
use log::info;

/// Receives every window drained from a ring.
///
/// Delivery is lossy, windows dropped by a full ring never arrive.
pub trait TelemetryConsumer<const M: usize> {
    fn consume(&mut self, sample: &Sample<M>);
}

/// Prints each sample through the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

impl<const M: usize> TelemetryConsumer<M> for LogSink {
    fn consume(&mut self, sample: &Sample<M>) {
        info!("query done: {} (frame {})", sample.slot, sample.sequence);
        for (kind, value) in sample.metrics.iter().zip(sample.values.iter()) {
            info!("{}: {}", kind, value);
        }
    }
}

impl<const M: usize> TelemetryConsumer<M> for Vec<Sample<M>> {
    fn consume(&mut self, sample: &Sample<M>) {
        self.push(sample.clone());
    }
}

pub struct FrameDriver<C> {
    consumer: C,
    frames: u64,
}

impl<C> FrameDriver<C> {
    pub fn new(consumer: C) -> Self {
        FrameDriver {
            consumer,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    pub fn consumer_mut(&mut self) -> &mut C {
        &mut self.consumer
    }

    pub fn into_consumer(self) -> C {
        self.consumer
    }

    /// Run one frame: drain the oldest window, then measure this frame's rendering.
    ///
    /// The window is ended right after the commands are issued, not when the device
    /// executed them. If rendering fails the window stays open and is closed by the
    /// next frame.
    pub fn frame<B, T, const M: usize>(
        &mut self,
        ring: &mut QueryRing<B, M>,
        target: &mut T,
        width: u32,
        height: u32,
    ) -> Result<(), Error>
    where
        B: QueryBackend,
        T: RenderTarget,
        C: TelemetryConsumer<M>,
    {
        target.ensure_size(width, height)?;

        if let Some(sample) = ring.drain()? {
            self.consumer.consume(&sample);
        }

        ring.begin_window()?;
        target.render_frame()?;
        ring.end_window()?;

        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FakeDevice, FakeTarget, MetricKind, RingDesc};

    #[test]
    fn rendering_is_bracketed_by_all_queries() {
        let device = FakeDevice::new(1);
        let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL)
            .unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

        for _ in 0..4 {
            device.advance_frame();
            driver.frame(&mut ring, &mut target, 640, 480).unwrap();
        }

        assert_eq!(target.frames, 4);
        for open in &target.bracketed {
            assert_eq!(open.as_slice(), &MetricKind::ALL[..]);
        }
        assert!(device.open_metrics().is_empty());
        assert!(!ring.is_window_open());
        assert_eq!(driver.frames(), 4);
        assert_eq!(driver.consumer().len(), 3);
    }

    #[test]
    fn resizes_before_rendering() {
        let device = FakeDevice::new(0);
        let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL)
            .unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(LogSink);

        driver.frame(&mut ring, &mut target, 100, 100).unwrap();
        driver.frame(&mut ring, &mut target, 100, 100).unwrap();
        driver.frame(&mut ring, &mut target, 120, 80).unwrap();
        assert_eq!(target.extents, [(100, 100), (120, 80)]);
    }

    #[test]
    fn failed_render_window_is_closed_next_frame() {
        let device = FakeDevice::new(0);
        let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL)
            .unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(Vec::<Sample<3>>::new());

        target.fail_render = true;
        assert!(matches!(
            driver.frame(&mut ring, &mut target, 8, 8),
            Err(Error::DeviceLost)
        ));
        assert!(ring.is_window_open());

        target.fail_render = false;
        driver.frame(&mut ring, &mut target, 8, 8).unwrap();
        driver.frame(&mut ring, &mut target, 8, 8).unwrap();
        assert_eq!(ring.submitted(), 3);
        let sequences = driver
            .consumer()
            .iter()
            .map(|s| s.sequence)
            .collect::<Vec<_>>();
        assert_eq!(sequences, [0]);
        assert_eq!(ring.pending(), 2);
    }

    #[test]
    fn device_loss_propagates() {
        let device = FakeDevice::new(0);
        let mut ring = QueryRing::new(device.clone(), &RingDesc::default(), MetricKind::ALL)
            .unwrap();
        let mut target = FakeTarget::new(&device);
        let mut driver = FrameDriver::new(LogSink);

        driver.frame(&mut ring, &mut target, 8, 8).unwrap();
        device.lose();
        assert!(matches!(
            driver.frame(&mut ring, &mut target, 8, 8),
            Err(Error::DeviceLost)
        ));
    }
}
