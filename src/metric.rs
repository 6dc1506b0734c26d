use std::fmt;

/// Measurement recorded by a single query of a slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MetricKind {
    /// GPU time between begin and end, in nanoseconds.
    TimeElapsed,
    /// Number of samples passing depth and stencil tests.
    SamplesPassed,
    /// Number of primitives assembled by the input stage.
    PrimitivesGenerated,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::TimeElapsed,
        MetricKind::SamplesPassed,
        MetricKind::PrimitivesGenerated,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::TimeElapsed => "TIME_ELAPSED",
            MetricKind::SamplesPassed => "SAMPLES_PASSED",
            MetricKind::PrimitivesGenerated => "PRIMITIVES_GENERATED",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.name())
    }
}
