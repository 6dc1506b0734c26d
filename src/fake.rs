//! Deterministic stand-ins for the device and the render target.
//!
//! `FakeDevice` is a cheap handle to shared simulated state, so tests keep a clone
//! around to drive simulated time and inspect counters while a ring owns another.

use crate::{Error, MetricKind, QueryBackend, RenderTarget};
use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FakeHandle(usize);

#[derive(Debug)]
struct FakeQuery {
    kind: MetricKind,
    live: bool,
    ended_at: Option<u64>,
    value: u64,
}

#[derive(Debug, Default)]
struct FakeState {
    frame: u64,
    latency: Option<u64>,
    unsupported: Vec<MetricKind>,
    stalled: Vec<MetricKind>,
    open: Vec<MetricKind>,
    queries: Vec<FakeQuery>,
    allocated: usize,
    live: usize,
    begins: usize,
    ends: usize,
    windows: [u64; 3],
    lost: bool,
}

/// Simulated device whose results become ready a fixed number of frames after `end`.
///
/// Latency changes apply to windows already ended.
#[derive(Debug, Clone)]
pub struct FakeDevice(Rc<RefCell<FakeState>>);

impl FakeDevice {
    pub fn new(latency: u64) -> Self {
        FakeDevice(Rc::new(RefCell::new(FakeState {
            latency: Some(latency),
            ..FakeState::default()
        })))
    }

    /// Device which never finishes any query.
    pub fn stalled() -> Self {
        let device = FakeDevice::new(0);
        device.set_latency(None);
        device
    }

    /// Report `kind` as unsupported.
    pub fn without(self, kind: MetricKind) -> Self {
        self.0.borrow_mut().unsupported.push(kind);
        self
    }

    pub fn set_latency(&self, latency: Option<u64>) {
        self.0.borrow_mut().latency = latency;
    }

    /// Hold back results of `kind` regardless of latency.
    pub fn stall(&self, kind: MetricKind, stalled: bool) {
        let mut state = self.0.borrow_mut();
        state.stalled.retain(|k| *k != kind);
        if stalled {
            state.stalled.push(kind);
        }
    }

    /// Every following poll and readback fails with `Error::DeviceLost`.
    pub fn lose(&self) {
        self.0.borrow_mut().lost = true;
    }

    pub fn advance_frame(&self) {
        self.advance_frames(1);
    }

    pub fn advance_frames(&self, frames: u64) {
        self.0.borrow_mut().frame += frames;
    }

    pub fn live_handles(&self) -> usize {
        self.0.borrow().live
    }

    pub fn allocated_handles(&self) -> usize {
        self.0.borrow().allocated
    }

    pub fn begins(&self) -> usize {
        self.0.borrow().begins
    }

    pub fn ends(&self) -> usize {
        self.0.borrow().ends
    }

    /// Metrics with a query currently open.
    pub fn open_metrics(&self) -> Vec<MetricKind> {
        self.0.borrow().open.clone()
    }

    fn kind_index(kind: MetricKind) -> usize {
        match kind {
            MetricKind::TimeElapsed => 0,
            MetricKind::SamplesPassed => 1,
            MetricKind::PrimitivesGenerated => 2,
        }
    }
}

impl FakeState {
    fn query(&mut self, handle: FakeHandle) -> Result<&mut FakeQuery, Error> {
        match self.queries.get_mut(handle.0) {
            Some(query) if query.live => Ok(query),
            _ => Err(Error::Device {
                cause: format!("invalid query handle {:?}", handle),
            }),
        }
    }

    fn check_lost(&self) -> Result<(), Error> {
        if self.lost {
            Err(Error::DeviceLost)
        } else {
            Ok(())
        }
    }
}

impl QueryBackend for FakeDevice {
    type Handle = FakeHandle;

    fn supports(&self, kind: MetricKind) -> bool {
        !self.0.borrow().unsupported.contains(&kind)
    }

    fn allocate_handles(
        &mut self,
        kind: MetricKind,
        count: usize,
    ) -> Result<Vec<FakeHandle>, Error> {
        let mut state = self.0.borrow_mut();
        let start = state.queries.len();
        state.queries.extend((0..count).map(|_| FakeQuery {
            kind,
            live: true,
            ended_at: None,
            value: 0,
        }));
        state.allocated += count;
        state.live += count;
        Ok((start..start + count).map(FakeHandle).collect())
    }

    fn begin(&mut self, handle: FakeHandle, kind: MetricKind) -> Result<(), Error> {
        let mut state = self.0.borrow_mut();
        if state.open.contains(&kind) {
            return Err(Error::Device {
                cause: format!("{} query already active", kind),
            });
        }
        let query = state.query(handle)?;
        if query.kind != kind {
            return Err(Error::Device {
                cause: format!("query {:?} is not a {} query", handle, kind),
            });
        }
        query.ended_at = None;
        state.open.push(kind);
        state.begins += 1;
        Ok(())
    }

    fn end(&mut self, handle: FakeHandle, kind: MetricKind) -> Result<(), Error> {
        let mut state = self.0.borrow_mut();
        if state.query(handle)?.kind != kind {
            return Err(Error::Device {
                cause: format!("query {:?} is not a {} query", handle, kind),
            });
        }
        if !state.open.contains(&kind) {
            return Err(Error::Device {
                cause: format!("no active {} query", kind),
            });
        }
        state.open.retain(|k| *k != kind);
        state.ends += 1;

        let index = Self::kind_index(kind);
        state.windows[index] += 1;
        let value = state.windows[index] * 1000 + index as u64;
        let frame = state.frame;

        let query = state.query(handle)?;
        query.value = value;
        query.ended_at = Some(frame);
        Ok(())
    }

    fn is_result_ready(&mut self, handle: FakeHandle) -> Result<bool, Error> {
        let mut state = self.0.borrow_mut();
        state.check_lost()?;
        let frame = state.frame;
        let latency = state.latency;
        let stalled = state.stalled.clone();
        let query = state.query(handle)?;
        if stalled.contains(&query.kind) {
            return Ok(false);
        }
        match (query.ended_at, latency) {
            (Some(ended_at), Some(latency)) => Ok(frame >= ended_at + latency),
            _ => Ok(false),
        }
    }

    fn get_result(&mut self, handle: FakeHandle) -> Result<u64, Error> {
        let mut state = self.0.borrow_mut();
        state.check_lost()?;
        let query = state.query(handle)?;
        Ok(query.value)
    }

    fn release_handles(&mut self, handles: Vec<FakeHandle>) {
        let mut state = self.0.borrow_mut();
        let state = &mut *state;
        for handle in handles {
            if let Some(query) = state.queries.get_mut(handle.0) {
                if query.live {
                    query.live = false;
                    state.live -= 1;
                }
            }
        }
    }
}

/// Render target recording what the frame driver asked of it.
#[derive(Debug)]
pub struct FakeTarget {
    device: FakeDevice,
    pub extents: Vec<(u32, u32)>,
    pub frames: usize,
    /// Open metrics observed while each frame was rendered.
    pub bracketed: Vec<Vec<MetricKind>>,
    pub fail_render: bool,
}

impl FakeTarget {
    pub fn new(device: &FakeDevice) -> Self {
        FakeTarget {
            device: device.clone(),
            extents: Vec::new(),
            frames: 0,
            bracketed: Vec::new(),
            fail_render: false,
        }
    }
}

impl RenderTarget for FakeTarget {
    fn ensure_size(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if self.extents.last() != Some(&(width, height)) {
            self.extents.push((width, height));
        }
        Ok(())
    }

    fn render_frame(&mut self) -> Result<(), Error> {
        if self.fail_render {
            return Err(Error::DeviceLost);
        }
        self.frames += 1;
        self.bracketed.push(self.device.open_metrics());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_follow_latency() {
        let mut device = FakeDevice::new(2);
        let handles = device.allocate_handles(MetricKind::TimeElapsed, 1).unwrap();
        device.begin(handles[0], MetricKind::TimeElapsed).unwrap();
        device.end(handles[0], MetricKind::TimeElapsed).unwrap();

        assert!(!device.is_result_ready(handles[0]).unwrap());
        device.advance_frame();
        assert!(!device.is_result_ready(handles[0]).unwrap());
        device.advance_frame();
        assert!(device.is_result_ready(handles[0]).unwrap());
        assert_eq!(device.get_result(handles[0]).unwrap(), 1000);
    }

    #[test]
    fn nested_begin_of_same_kind_fails() {
        let mut device = FakeDevice::new(0);
        let handles = device.allocate_handles(MetricKind::SamplesPassed, 2).unwrap();
        device.begin(handles[0], MetricKind::SamplesPassed).unwrap();
        assert!(device.begin(handles[1], MetricKind::SamplesPassed).is_err());
    }

    #[test]
    fn rejected_end_changes_nothing() {
        let mut device = FakeDevice::new(0);
        let timers = device.allocate_handles(MetricKind::TimeElapsed, 1).unwrap();
        let samples = device.allocate_handles(MetricKind::SamplesPassed, 1).unwrap();
        device.begin(timers[0], MetricKind::TimeElapsed).unwrap();

        assert!(device.end(samples[0], MetricKind::TimeElapsed).is_err());
        assert!(device.end(FakeHandle(99), MetricKind::TimeElapsed).is_err());
        assert_eq!(device.ends(), 0);
        assert_eq!(device.open_metrics(), [MetricKind::TimeElapsed]);

        device.end(timers[0], MetricKind::TimeElapsed).unwrap();
        assert_eq!(device.get_result(timers[0]).unwrap(), 1000);
    }

    #[test]
    fn released_handles_are_invalid() {
        let mut device = FakeDevice::new(0);
        let handles = device.allocate_handles(MetricKind::SamplesPassed, 2).unwrap();
        device.release_handles(handles.clone());
        assert_eq!(device.live_handles(), 0);
        assert_eq!(device.allocated_handles(), 2);
        assert!(device.is_result_ready(handles[0]).is_err());
    }

    #[test]
    fn lost_device_fails_polls() {
        let mut device = FakeDevice::new(0);
        let handles = device.allocate_handles(MetricKind::TimeElapsed, 1).unwrap();
        device.lose();
        assert!(matches!(
            device.is_result_ready(handles[0]),
            Err(Error::DeviceLost)
        ));
    }
}
