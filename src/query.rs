//! Query slot pool
//!
//! Owns `depth x M` device queries, grouped into slots of one query per metric.
//! Handles are allocated once on creation and released when the pool is dropped.

use crate::{Error, MetricKind};
use log::warn;
use std::{fmt, mem};

/// Device capability required for measuring a frame.
///
/// None of the operations may wait for the device. `is_result_ready` is a poll.
pub trait QueryBackend {
    type Handle: Copy + fmt::Debug;

    /// Checked once per metric when a pool is created.
    fn supports(&self, _kind: MetricKind) -> bool {
        true
    }

    fn allocate_handles(
        &mut self,
        kind: MetricKind,
        count: usize,
    ) -> Result<Vec<Self::Handle>, Error>;

    fn begin(&mut self, handle: Self::Handle, kind: MetricKind) -> Result<(), Error>;

    fn end(&mut self, handle: Self::Handle, kind: MetricKind) -> Result<(), Error>;

    fn is_result_ready(&mut self, handle: Self::Handle) -> Result<bool, Error>;

    fn get_result(&mut self, handle: Self::Handle) -> Result<u64, Error>;

    fn release_handles(&mut self, handles: Vec<Self::Handle>);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlotState {
    Free,
    /// Queries begun, not yet ended.
    InFlight,
    /// Queries ended, results not yet collected.
    PendingRead,
}

pub struct QueryPool<B: QueryBackend, const M: usize> {
    backend: B,
    metrics: [MetricKind; M],
    // handles[metric][slot]
    handles: Vec<Vec<B::Handle>>,
    states: Vec<SlotState>,
}

impl<B: QueryBackend, const M: usize> QueryPool<B, M> {
    pub fn new(backend: B, metrics: [MetricKind; M], depth: usize) -> Result<Self, Error> {
        if depth == 0 {
            return Err(Error::ZeroDepth);
        }
        for (i, kind) in metrics.iter().enumerate() {
            if metrics[..i].contains(kind) {
                return Err(Error::DuplicateMetric(*kind));
            }
            if !backend.supports(*kind) {
                return Err(Error::UnsupportedMetric(*kind));
            }
        }

        let mut pool = QueryPool {
            backend,
            metrics,
            handles: Vec::with_capacity(M),
            states: vec![SlotState::Free; depth],
        };

        // Pushed one metric at a time so a failing allocation releases the earlier ones on drop.
        for kind in metrics.iter() {
            let handles = pool.backend.allocate_handles(*kind, depth)?;
            let allocated = handles.len();
            pool.handles.push(handles);
            if allocated != depth {
                return Err(Error::Device {
                    cause: format!(
                        "allocated {} {} queries, expected {}",
                        allocated, kind, depth
                    ),
                });
            }
        }

        Ok(pool)
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn metrics(&self) -> &[MetricKind; M] {
        &self.metrics
    }

    /// `None` for slots outside the pool.
    pub fn state(&self, slot: usize) -> Option<SlotState> {
        self.states.get(slot).copied()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Begin all queries of `slot`.
    ///
    /// A slot still pending read may be restarted, its previous window is lost.
    pub fn start(&mut self, slot: usize) -> Result<(), Error> {
        self.expect_not(slot, SlotState::InFlight, "start")?;
        for (kind, handles) in self.metrics.iter().zip(&self.handles) {
            self.backend.begin(handles[slot], *kind)?;
        }
        self.states[slot] = SlotState::InFlight;
        Ok(())
    }

    /// End all queries of `slot`. Results become available at some later point.
    pub fn stop(&mut self, slot: usize) -> Result<(), Error> {
        self.expect(slot, SlotState::InFlight, "stop")?;
        for (kind, handles) in self.metrics.iter().zip(&self.handles) {
            self.backend.end(handles[slot], *kind)?;
        }
        self.states[slot] = SlotState::PendingRead;
        Ok(())
    }

    /// Poll all results of `slot`, returning either every value or none.
    pub fn try_collect(&mut self, slot: usize) -> Result<Option<[u64; M]>, Error> {
        self.expect(slot, SlotState::PendingRead, "collect")?;
        for handles in &self.handles {
            if !self.backend.is_result_ready(handles[slot])? {
                return Ok(None);
            }
        }

        let mut values = [0u64; M];
        for (value, handles) in values.iter_mut().zip(&self.handles) {
            *value = self.backend.get_result(handles[slot])?;
        }
        self.states[slot] = SlotState::Free;
        Ok(Some(values))
    }

    /// Close an open window and forget it. Pending results are dropped without touching the device.
    fn discard(&mut self, slot: usize) -> Result<(), Error> {
        if mem::replace(&mut self.states[slot], SlotState::Free) == SlotState::InFlight {
            for (kind, handles) in self.metrics.iter().zip(&self.handles) {
                self.backend.end(handles[slot], *kind)?;
            }
        }
        Ok(())
    }

    fn slot_state(&self, slot: usize, op: &'static str) -> Result<SlotState, Error> {
        self.state(slot).ok_or(Error::SlotOutOfRange {
            slot,
            depth: self.depth(),
            op,
        })
    }

    fn expect(&self, slot: usize, state: SlotState, op: &'static str) -> Result<(), Error> {
        match self.slot_state(slot, op)? {
            s if s == state => Ok(()),
            s => Err(Error::InvalidSlotState { slot, state: s, op }),
        }
    }

    fn expect_not(&self, slot: usize, state: SlotState, op: &'static str) -> Result<(), Error> {
        match self.slot_state(slot, op)? {
            s if s == state => Err(Error::InvalidSlotState { slot, state: s, op }),
            _ => Ok(()),
        }
    }
}

impl<B: QueryBackend, const M: usize> Drop for QueryPool<B, M> {
    fn drop(&mut self) {
        for slot in 0..self.states.len() {
            if let Err(err) = self.discard(slot) {
                warn!("failed to end queries of slot {} on teardown: {}", slot, err);
            }
        }
        for handles in self.handles.drain(..) {
            self.backend.release_handles(handles);
        }
    }
}
