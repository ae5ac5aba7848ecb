use thiserror::Error;

/// Failures from the audio-graph runtime binding. Distinct from
/// [`ovd_core::EngineError`], which covers configuration/target errors —
/// these are the startup/runtime-degradation kinds that originate from
/// PipeWire itself.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph runtime init failed")]
    InitFailed,

    #[error("failed to connect core: {0}")]
    CoreConnectFailed(String),

    #[error("failed to build capture stream: {0}")]
    CaptureStreamFailed(String),

    #[error("failed to build playback stream: {0}")]
    PlaybackStreamFailed(String),
}
