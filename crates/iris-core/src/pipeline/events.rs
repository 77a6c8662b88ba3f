use crate::controls::{FrameMetadata, RequestControls};

/// Events the pipeline handler feeds into the loop.
#[derive(Debug)]
pub enum IpaEvent {
    /// A request was admitted for `frame` with these controls.
    QueueRequest {
        frame: u64,
        controls: RequestControls,
    },
    /// The parameter buffer for `frame` must be filled now.
    FillParams { frame: u64 },
    /// The statistics buffer for `frame` is ready to read.
    StatsReady {
        frame: u64,
        buffer: u32,
        timestamp_us: u64,
    },
    /// The sensor started exposing frame `sequence`.
    FrameStart { sequence: u32 },
}

/// Events the loop emits back to the pipeline handler.
#[derive(Debug, PartialEq)]
pub enum IpaAction {
    /// The parameter buffer for `frame` holds a complete configuration.
    ParamsFilled { frame: u64 },
    /// Processing of `frame` finished; its result metadata is attached.
    MetadataReady {
        frame: u64,
        metadata: FrameMetadata,
    },
}
