use thiserror::Error;

/// Errors surfaced by workflow access, building and execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("invalid argument `index`: {index} is out of range for a workflow of {len} units")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("failed to allocate an aligned buffer of {length} floats")]
    AllocationFailed { length: usize },

    #[error("input has {actual} elements but the workflow consumes {expected}")]
    InputSizeMismatch { expected: usize, actual: usize },

    #[error("output has room for {actual} elements but the workflow produces {expected}")]
    OutputSizeMismatch { expected: usize, actual: usize },

    #[error(
        "unit {index} produces {produced} elements but unit {next} consumes {expected}",
        next = .index + 1
    )]
    ChainMismatch {
        index: usize,
        produced: usize,
        expected: usize,
    },

    #[error("scratch buffers hold {capacity} floats but the workflow needs {required}")]
    ScratchTooSmall { required: usize, capacity: usize },

    #[error("unit {index} ({name}) panicked during execution")]
    UnitPanicked { index: usize, name: String },
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
