use crate::{MetricKind, SlotState};
use std::fmt;

#[derive(Debug)]
pub enum Error {
    ZeroDepth,
    DepthTooSmall {
        depth: usize,
    },
    UnsupportedMetric(MetricKind),
    DuplicateMetric(MetricKind),
    InvalidSlotState {
        slot: usize,
        state: SlotState,
        op: &'static str,
    },
    SlotOutOfRange {
        slot: usize,
        depth: usize,
        op: &'static str,
    },
    Device {
        cause: String,
    },
    DeviceLost,
}

impl Error {
    /// Configuration errors are detected once while building a ring and abort startup.
    pub fn is_configuration(&self) -> bool {
        match *self {
            Error::ZeroDepth
            | Error::DepthTooSmall { .. }
            | Error::UnsupportedMetric(_)
            | Error::DuplicateMetric(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ZeroDepth => write!(fmt, "Ring depth must not be zero"),
            Error::DepthTooSmall { depth } => {
                write!(fmt, "Ring depth {} can never drain, at least 2 slots required", depth)
            }
            Error::UnsupportedMetric(kind) => write!(fmt, "Unsupported metric: {}", kind),
            Error::DuplicateMetric(kind) => write!(fmt, "Metric requested twice: {}", kind),
            Error::InvalidSlotState { slot, state, op } => {
                write!(fmt, "Invalid {} on slot {} in state {:?}", op, slot, state)
            }
            Error::SlotOutOfRange { slot, depth, op } => {
                write!(fmt, "Invalid {} on slot {}, pool holds {} slots", op, slot, depth)
            }
            Error::Device { ref cause } => write!(fmt, "Device: {}", cause),
            Error::DeviceLost => write!(fmt, "Device Lost"),
        }
    }
}

impl std::error::Error for Error {}
