//! Fixed quantities shared by every crate in the workspace.

/// Number of parametric bands. Fixed; the spec has no provision for a
/// variable band count.
pub const BANDS: usize = 10;

/// Center frequency in Hz for each band, lowest to highest.
pub const BAND_FREQS_HZ: [f32; BANDS] =
    [32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0];

/// Fixed channel count. Non-goal: anything other than stereo.
pub const CHANNELS: usize = 2;

/// Default Q for every band's peaking filter.
pub const DEFAULT_Q: f32 = 0.707;

/// Soft-clip ceiling applied to every capture-path output sample.
pub const CLIP_CEILING: f32 = 0.95;

/// Capture path processes in blocks of at most this many frames.
pub const BLOCK_FRAMES: usize = 512;

/// Inclusive bounds on the configured sample rate.
pub const RATE_MIN: u32 = 8_000;
pub const RATE_MAX: u32 = 192_000;

/// Inclusive bounds on the configured poll budget, in milliseconds.
pub const POLL_MS_MIN: u32 = 1;
pub const POLL_MS_MAX: u32 = 50;

/// Inclusive bounds the ring capacity is clamped into.
pub const RING_FRAMES_MIN: u32 = 128;
pub const RING_FRAMES_MAX: u32 = 8192;

/// Broad channel-count range accepted at `configure` time; `start` enforces
/// the hard stereo requirement independently (see `EngineConfig::validate`
/// and the engine controller's own check).
pub const CONFIG_CHANNELS_MIN: u16 = 1;
pub const CONFIG_CHANNELS_MAX: u16 = 8;

/// Iteration cap for the sink-discovery sync/done round trip.
pub const DISCOVERY_ITERATION_CAP: u32 = 100;

/// Poll budget, in ms, used for each discovery-loop iteration.
pub const DISCOVERY_POLL_MS: u32 = 10;

/// Fixed identity of the virtual capture sink, as presented to the graph
/// runtime.
pub const VIRTUAL_SINK_NAME: &str = "openlinkhub-virtual-device";
pub const VIRTUAL_SINK_DESCRIPTION: &str = "OpenLinkHub Virtual Audio Device";
pub const VIRTUAL_SINK_ROLE: &str = "DSP";
pub const VIRTUAL_GROUP: &str = "openlinkhub-audio";

/// Fixed identity of the playback node.
pub const PLAYBACK_NODE_NAME: &str = "openlinkhub-virtual-device-playback";
pub const PLAYBACK_MEDIA_ROLE: &str = "Music";
