use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};

use ovd_core::{db_from_mdb, EngineConfig, BANDS, BAND_FREQS_HZ, CHANNELS, DEFAULT_Q};
use ovd_dsp::{CoefficientTable, Coeffs};
use parking_lot::Mutex;

use crate::capture::{self, ChannelStates};
use crate::registry::SinkRegistry;
use crate::ring::Ring;

/// Wraps a value touched by exactly one thread (the capture callback) so
/// it can live inside a `Sync` struct shared via `Arc` without paying for
/// a lock neither side needs.
pub struct AudioThreadCell<T>(UnsafeCell<T>);

// SAFETY: only the capture callback ever calls `get_mut`; every other
// consumer of `Shared` never touches this field.
unsafe impl<T> Sync for AudioThreadCell<T> {}

impl<T> AudioThreadCell<T> {
    pub fn new(value: T) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// # Safety
    /// Caller must guarantee only the capture callback thread calls this.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn get_mut(&self) -> &mut T {
        &mut *self.0.get()
    }
}

/// Everything the audio thread, the loop thread, and control threads
/// share. Owned by the engine and `Arc`-wrapped so the PipeWire callback
/// closures (which must be `'static` + `Send`) can hold a clone.
pub struct Shared {
    pub config: EngineConfig,
    pub band_mdb: [AtomicI32; BANDS],
    pub master_gain_bits: AtomicU32,
    pub coeffs: CoefficientTable,
    pub ring: Ring,
    pub states: AudioThreadCell<ChannelStates>,
    pub dropped_frames: AtomicU64,
    pub reconnect: AtomicBool,
    pub quit: AtomicBool,
    pub target_serial: AtomicU32,
    pub pb_streaming: AtomicBool,
    pub registry: SinkRegistry,
    pub last_error: Mutex<Option<String>>,
}

impl Shared {
    pub fn new(config: EngineConfig) -> Self {
        const ZERO: AtomicI32 = AtomicI32::new(0);
        let ring = Ring::new(config.ring_frames as usize, CHANNELS);
        Self {
            config,
            band_mdb: [ZERO; BANDS],
            master_gain_bits: AtomicU32::new(1.0_f32.to_bits()),
            coeffs: CoefficientTable::new(),
            ring,
            states: AudioThreadCell::new(capture::new_channel_states()),
            dropped_frames: AtomicU64::new(0),
            reconnect: AtomicBool::new(false),
            quit: AtomicBool::new(false),
            target_serial: AtomicU32::new(0),
            pb_streaming: AtomicBool::new(false),
            registry: SinkRegistry::new(),
            last_error: Mutex::new(None),
        }
    }

    pub fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    /// Recomputes every band's coefficients for both channels from the
    /// current `band_mdb` values and publishes the result. Call only from
    /// the control/loop thread.
    pub fn rebuild_coeffs(&self) {
        let fs = self.config.rate as f32;
        let gains_db: Vec<f32> = self
            .band_mdb
            .iter()
            .map(|m| db_from_mdb(m.load(Ordering::Relaxed)))
            .collect();
        self.coeffs.rebuild(|table| {
            for band in 0..BANDS {
                let c = Coeffs::design(fs, BAND_FREQS_HZ[band], DEFAULT_Q, gains_db[band]);
                for channel in table.iter_mut() {
                    channel[band] = c;
                }
            }
        });
    }
}
