use thiserror::Error;

/// Errors surfaced by the control surface. Spans configuration, startup,
/// and target-selection failures; runtime degradation (stream loss, ring
/// overrun, sink disappearance) is absorbed by the controller and never
/// reaches this type.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("sample rate {0} out of range 8000..=192000")]
    InvalidRate(u32),

    #[error("channel count {0} out of range 1..=8")]
    InvalidChannels(u16),

    #[error("poll budget {0}ms out of range 1..=50")]
    InvalidPollMs(u32),

    #[error("latency hint strings must be non-empty")]
    MissingLatencyHint,

    #[error("configure refused: engine already started")]
    AlreadyStarted,

    #[error("start refused: engine not configured")]
    NotConfigured,

    #[error("stereo required at start, configured channel count was {0}")]
    ChannelMismatch(u16),

    #[error("audio graph runtime unavailable")]
    GraphUnavailable,

    #[error("sink serial {0} not present in registry")]
    UnknownSinkSerial(u32),
}
