use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrisError {
    #[error("Unsupported ISP hardware revision {0}")]
    UnsupportedHardware(u32),

    #[error("Sensor does not expose the {0} control")]
    MissingControl(&'static str),

    #[error("Invalid statistics buffer: expected at least {expected} bytes, got {got}")]
    InvalidStats { expected: usize, got: usize },

    #[error("Invalid parameter buffer: expected at least {expected} bytes, got {got}")]
    InvalidParams { expected: usize, got: usize },

    #[error("Failed to map buffer {id}: {reason}")]
    BufferMappingFailed { id: u32, reason: String },

    #[error("Unknown pipeline event opcode {0}")]
    UnknownEvent(u32),

    #[error("Degenerate statistics: {0}")]
    AlgorithmDegenerate(&'static str),

    #[error("Parameter buffer underrun")]
    ParamBufferUnderrun,

    #[error("Statistics buffer underrun")]
    StatBufferUnderrun,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IrisError>;
