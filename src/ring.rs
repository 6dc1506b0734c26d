//! Round-robin scheduling of query slots.
//!
//! The write cursor names the slot the next window is recorded into, the read cursor the
//! oldest window not yet drained. `read == write` means nothing is pending. The write
//! cursor never advances onto the read cursor: when the ring is full the current write
//! slot is reused and the window it held is dropped.

use crate::{Error, MetricKind, QueryBackend, QueryPool, SlotState};
use log::{debug, trace};

pub const DEFAULT_RING_DEPTH: usize = 8;

#[derive(Debug, Copy, Clone)]
pub struct RingDesc {
    /// Number of slots, should exceed the device result latency in frames.
    pub depth: usize,
}

impl Default for RingDesc {
    fn default() -> Self {
        RingDesc {
            depth: DEFAULT_RING_DEPTH,
        }
    }
}

/// Results of one measured window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample<const M: usize> {
    pub slot: usize,
    /// Submission order of the window, starting at 0.
    pub sequence: u64,
    pub metrics: [MetricKind; M],
    pub values: [u64; M],
}

impl<const M: usize> Sample<M> {
    pub fn get(&self, kind: MetricKind) -> Option<u64> {
        self.metrics
            .iter()
            .position(|k| *k == kind)
            .map(|i| self.values[i])
    }
}

pub struct QueryRing<B: QueryBackend, const M: usize> {
    pool: QueryPool<B, M>,
    read_index: usize,
    write_index: usize,
    sequences: Vec<u64>,
    submitted: u64,
    drained: u64,
    saturations: u64,
}

impl<B: QueryBackend, const M: usize> QueryRing<B, M> {
    pub fn new(backend: B, desc: &RingDesc, metrics: [MetricKind; M]) -> Result<Self, Error> {
        match desc.depth {
            0 => return Err(Error::ZeroDepth),
            1 => return Err(Error::DepthTooSmall { depth: 1 }),
            _ => {}
        }
        let pool = QueryPool::new(backend, metrics, desc.depth)?;

        Ok(QueryRing {
            pool,
            read_index: 0,
            write_index: 0,
            sequences: vec![0; desc.depth],
            submitted: 0,
            drained: 0,
            saturations: 0,
        })
    }

    pub fn depth(&self) -> usize {
        self.pool.depth()
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    /// Windows submitted but not yet drained, `(write - read) mod depth`.
    pub fn pending(&self) -> usize {
        (self.write_index + self.depth() - self.read_index) % self.depth()
    }

    /// Windows ended so far, including dropped ones.
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    pub fn drained(&self) -> u64 {
        self.drained
    }

    /// Number of times the write cursor was held back by a full ring.
    ///
    /// Each one costs exactly one window.
    pub fn saturations(&self) -> u64 {
        self.saturations
    }

    pub fn is_window_open(&self) -> bool {
        self.pool.state(self.write_index) == Some(SlotState::InFlight)
    }

    pub fn pool(&self) -> &QueryPool<B, M> {
        &self.pool
    }

    pub fn backend(&self) -> &B {
        self.pool.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.pool.backend_mut()
    }

    /// Collect the oldest pending window if the device finished it.
    ///
    /// `Ok(None)` if nothing is pending or the results aren't ready yet.
    pub fn drain(&mut self) -> Result<Option<Sample<M>>, Error> {
        if self.read_index == self.write_index {
            return Ok(None);
        }

        let slot = self.read_index;
        let values = match self.pool.try_collect(slot)? {
            Some(values) => values,
            None => {
                debug!("query busy: {}", slot);
                return Ok(None);
            }
        };
        trace!("query done: {}", slot);

        self.read_index = (slot + 1) % self.depth();
        self.drained += 1;

        Ok(Some(Sample {
            slot,
            sequence: self.sequences[slot],
            metrics: *self.pool.metrics(),
            values,
        }))
    }

    /// Drain every window which is ready, stopping at the first one which isn't.
    pub fn drain_ready(&mut self) -> Result<Vec<Sample<M>>, Error> {
        let mut samples = Vec::new();
        while let Some(sample) = self.drain()? {
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Open a measurement window on the write slot, closing a window left open before.
    pub fn begin_window(&mut self) -> Result<usize, Error> {
        if self.is_window_open() {
            self.end_window()?;
        }

        let slot = self.write_index;
        trace!("begin query round robin: {}", slot);
        self.pool.start(slot)?;
        self.sequences[slot] = self.submitted;
        Ok(slot)
    }

    /// Close the open window and move the write cursor on unless the ring is full.
    pub fn end_window(&mut self) -> Result<(), Error> {
        let slot = self.write_index;
        trace!("end query round robin: {}", slot);
        self.pool.stop(slot)?;
        self.submitted += 1;

        let next = (slot + 1) % self.depth();
        if next != self.read_index {
            self.write_index = next;
        } else {
            self.saturations += 1;
            debug!(
                "query ring full, dropping window {} in slot {}",
                self.sequences[slot], slot
            );
        }
        Ok(())
    }
}
