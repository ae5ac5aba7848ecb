use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ovd_core::{
    db_from_mdb, gain_bits_from_db, gain_from_bits, mdb_from_db, EngineConfig, EngineError, BANDS,
    VIRTUAL_SINK_NAME,
};
use parking_lot::Mutex;

use crate::graph;
use crate::shared::Shared;

/// The public control surface: lifecycle (configure -> start -> stop),
/// per-band and master gain, sink selection and queries. Every method is
/// safe to call from any non-audio thread; none of them touch the ring,
/// the coefficient arena's inactive slot, or per-channel filter state
/// directly — those are owned by the audio thread for the engine's
/// lifetime.
pub struct Engine {
    config: Mutex<Option<EngineConfig>>,
    started: AtomicBool,
    shared: Mutex<Option<Arc<Shared>>>,
    last_error: Mutex<Option<String>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            config: Mutex::new(None),
            started: AtomicBool::new(false),
            shared: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }

    fn set_last_error(&self, message: impl Into<String>) {
        *self.last_error.lock() = Some(message.into());
    }

    fn shared(&self) -> Option<Arc<Shared>> {
        self.shared.lock().clone()
    }

    /// Validates and stores configuration. Refused once `start` has been
    /// called. Calling twice with the same arguments before `start` is
    /// idempotent.
    #[allow(clippy::too_many_arguments)]
    pub fn configure(
        &self,
        rate: u32,
        channels: u16,
        poll_ms: u32,
        debug: bool,
        ring_frames: u32,
        latency: impl Into<String>,
        max_latency: impl Into<String>,
        preferred_sink_name: impl Into<String>,
        preferred_sink_desc: impl Into<String>,
    ) -> Result<(), EngineError> {
        if self.started.load(Ordering::Acquire) {
            let err = EngineError::AlreadyStarted;
            self.set_last_error(err.to_string());
            return Err(err);
        }
        let cfg = EngineConfig::new(
            rate,
            channels,
            poll_ms,
            debug,
            ring_frames,
            latency,
            max_latency,
            preferred_sink_name,
            preferred_sink_desc,
        )
        .inspect_err(|e| self.set_last_error(e.to_string()))?;
        *self.config.lock() = Some(cfg);
        Ok(())
    }

    /// Probes the graph runtime, allocates the ring and coefficient
    /// tables, connects capture (and playback, once a target is known),
    /// then services the event loop. Blocks the calling thread until
    /// [`stop`](Self::stop) is called or the loop cannot continue.
    pub fn start(&self) -> Result<(), EngineError> {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            let err = EngineError::AlreadyStarted;
            self.set_last_error(err.to_string());
            return Err(err);
        }

        let config = match self.config.lock().clone() {
            Some(c) => c,
            None => {
                self.started.store(false, Ordering::Release);
                let err = EngineError::NotConfigured;
                self.set_last_error(err.to_string());
                return Err(err);
            }
        };

        if config.channels != ovd_core::CHANNELS as u16 {
            self.started.store(false, Ordering::Release);
            let err = EngineError::ChannelMismatch(config.channels);
            self.set_last_error(err.to_string());
            return Err(err);
        }

        if !graph::probe_available() {
            self.started.store(false, Ordering::Release);
            let err = EngineError::GraphUnavailable;
            self.set_last_error(err.to_string());
            return Err(err);
        }

        let shared = Arc::new(Shared::new(config));
        shared.rebuild_coeffs();
        *self.shared.lock() = Some(shared.clone());

        let result = graph::run(shared.clone());

        *self.shared.lock() = None;
        self.started.store(false, Ordering::Release);

        result.map_err(|e| {
            self.set_last_error(e.to_string());
            EngineError::GraphUnavailable
        })
    }

    /// Raises the quit flag; the loop thread exits at its next iteration
    /// boundary. A no-op if the engine isn't running.
    pub fn stop(&self) {
        if let Some(shared) = self.shared() {
            shared.quit.store(true, Ordering::Release);
        }
    }

    pub fn running(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Sets one band's gain in dB. Out-of-range indices are ignored.
    pub fn band(&self, index: i32, db: f32) {
        if !(0..BANDS as i32).contains(&index) {
            return;
        }
        let Some(shared) = self.shared() else { return };
        shared.band_mdb[index as usize].store(mdb_from_db(db), Ordering::Relaxed);
        shared.rebuild_coeffs();
    }

    /// Sets the current millibel value of a band, for diagnostics.
    pub fn band_db(&self, index: i32) -> Option<f32> {
        if !(0..BANDS as i32).contains(&index) {
            return None;
        }
        let shared = self.shared()?;
        Some(db_from_mdb(shared.band_mdb[index as usize].load(Ordering::Relaxed)))
    }

    pub fn master(&self, db: f32) {
        if let Some(shared) = self.shared() {
            shared.master_gain_bits.store(gain_bits_from_db(db), Ordering::Release);
        }
    }

    pub fn master_linear(&self) -> Option<f32> {
        let shared = self.shared()?;
        Some(gain_from_bits(shared.master_gain_bits.load(Ordering::Acquire)))
    }

    /// Requests a downstream sink by serial. Errors if the serial isn't
    /// currently present in the registry; never mutates state on error.
    pub fn set_target(&self, serial: u32) -> Result<(), EngineError> {
        let shared = self.shared().ok_or(EngineError::NotConfigured)?;
        if serial == 0 || !shared.registry.contains_serial(serial) {
            let err = EngineError::UnknownSinkSerial(serial);
            self.set_last_error(err.to_string());
            return Err(err);
        }
        shared.target_serial.store(serial, Ordering::Release);
        shared.reconnect.store(true, Ordering::Release);
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.shared().map(|s| s.registry.count()).unwrap_or(0)
    }

    pub fn sink_name(&self, index: usize) -> Option<String> {
        self.shared()?.registry.describe(index).map(|r| r.name)
    }

    pub fn sink_desc(&self, index: usize) -> Option<String> {
        self.shared()?.registry.describe(index).map(|r| r.desc)
    }

    pub fn sink_serial(&self, index: usize) -> Option<u32> {
        self.shared()?.registry.describe(index).map(|r| r.serial)
    }

    pub fn current_sink_serial(&self) -> u32 {
        self.shared().map(|s| s.target_serial.load(Ordering::Acquire)).unwrap_or(0)
    }

    pub fn current_sink_name(&self) -> Option<String> {
        let shared = self.shared()?;
        let serial = shared.target_serial.load(Ordering::Acquire);
        (serial != 0).then(|| shared.registry.find_by_serial(serial)).flatten().map(|r| r.name)
    }

    pub fn current_sink_desc(&self) -> Option<String> {
        let shared = self.shared()?;
        let serial = shared.target_serial.load(Ordering::Acquire);
        (serial != 0).then(|| shared.registry.find_by_serial(serial)).flatten().map(|r| r.desc)
    }

    pub fn self_sink_name(&self) -> &'static str {
        VIRTUAL_SINK_NAME
    }

    pub fn dropped_frames(&self) -> u64 {
        self.shared().map(|s| s.dropped_frames.load(Ordering::Relaxed)).unwrap_or(0)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}
