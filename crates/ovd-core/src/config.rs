use crate::constants::{
    CONFIG_CHANNELS_MAX, CONFIG_CHANNELS_MIN, POLL_MS_MAX, POLL_MS_MIN, RATE_MAX, RATE_MIN,
    RING_FRAMES_MAX, RING_FRAMES_MIN,
};
use crate::error::EngineError;

/// Validated engine configuration, immutable for the lifetime of a run.
///
/// Constructed only through [`EngineConfig::new`], which performs the
/// bounds checks of the control surface's `configure` operation. Nothing
/// past this point re-validates these fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub rate: u32,
    pub channels: u16,
    pub poll_ms: u32,
    pub debug: bool,
    pub ring_frames: u32,
    pub latency: String,
    pub max_latency: String,
    pub preferred_sink_name: String,
    pub preferred_sink_desc: String,
}

impl EngineConfig {
    /// Validates and constructs a configuration. Ring capacity is clamped
    /// (never rejected); everything else is rejected outright if out of
    /// range.
    pub fn new(
        rate: u32,
        channels: u16,
        poll_ms: u32,
        debug: bool,
        ring_frames: u32,
        latency: impl Into<String>,
        max_latency: impl Into<String>,
        preferred_sink_name: impl Into<String>,
        preferred_sink_desc: impl Into<String>,
    ) -> Result<Self, EngineError> {
        if !(RATE_MIN..=RATE_MAX).contains(&rate) {
            return Err(EngineError::InvalidRate(rate));
        }
        if !(CONFIG_CHANNELS_MIN..=CONFIG_CHANNELS_MAX).contains(&channels) {
            return Err(EngineError::InvalidChannels(channels));
        }
        if !(POLL_MS_MIN..=POLL_MS_MAX).contains(&poll_ms) {
            return Err(EngineError::InvalidPollMs(poll_ms));
        }
        let latency = latency.into();
        let max_latency = max_latency.into();
        if latency.is_empty() || max_latency.is_empty() {
            return Err(EngineError::MissingLatencyHint);
        }

        Ok(Self {
            rate,
            channels,
            poll_ms,
            debug,
            ring_frames: ring_frames.clamp(RING_FRAMES_MIN, RING_FRAMES_MAX),
            latency,
            max_latency,
            preferred_sink_name: preferred_sink_name.into(),
            preferred_sink_desc: preferred_sink_desc.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_config(rate: u32, channels: u16, poll_ms: u32) -> Result<EngineConfig, EngineError> {
        EngineConfig::new(rate, channels, poll_ms, false, 512, "128/48000", "256/48000", "", "")
    }

    #[test]
    fn accepts_nominal_values() {
        let cfg = ok_config(48_000, 2, 10).unwrap();
        assert_eq!(cfg.rate, 48_000);
        assert_eq!(cfg.ring_frames, 512);
    }

    #[test]
    fn clamps_ring_frames_without_rejecting() {
        let cfg = EngineConfig::new(48_000, 2, 10, false, 64, "l", "m", "", "").unwrap();
        assert_eq!(cfg.ring_frames, 128);
        let cfg = EngineConfig::new(48_000, 2, 10, false, 100_000, "l", "m", "", "").unwrap();
        assert_eq!(cfg.ring_frames, 8192);
    }

    #[test]
    fn rejects_out_of_range_rate() {
        assert!(matches!(ok_config(7_999, 2, 10), Err(EngineError::InvalidRate(7_999))));
        assert!(matches!(ok_config(192_001, 2, 10), Err(EngineError::InvalidRate(192_001))));
    }

    #[test]
    fn rejects_out_of_range_poll() {
        assert!(matches!(ok_config(48_000, 2, 0), Err(EngineError::InvalidPollMs(0))));
        assert!(matches!(ok_config(48_000, 2, 51), Err(EngineError::InvalidPollMs(51))));
    }

    #[test]
    fn accepts_broader_channel_range_than_runtime_requires() {
        assert!(ok_config(48_000, 1, 10).is_ok());
        assert!(ok_config(48_000, 8, 10).is_ok());
        assert!(matches!(ok_config(48_000, 0, 10), Err(EngineError::InvalidChannels(0))));
        assert!(matches!(ok_config(48_000, 9, 10), Err(EngineError::InvalidChannels(9))));
    }

    #[test]
    fn rejects_empty_latency_hints() {
        assert!(matches!(
            EngineConfig::new(48_000, 2, 10, false, 512, "", "256/48000", "", ""),
            Err(EngineError::MissingLatencyHint)
        ));
    }

    #[test]
    fn is_idempotent_before_start() {
        let a = ok_config(48_000, 2, 10).unwrap();
        let b = ok_config(48_000, 2, 10).unwrap();
        assert_eq!(a, b);
    }
}
