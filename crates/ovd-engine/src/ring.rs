use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity single-producer/single-consumer interleaved-float ring.
///
/// `wpos`/`rpos` are frame indices in `[0, capacity)`. Empty when
/// `wpos == rpos`; full when `(wpos + 1) % capacity == rpos`. Usable
/// capacity is therefore `capacity - 1` frames — one slot is reserved so
/// the two conditions stay distinguishable. The writer touches only
/// `wpos` (release store) and reads `rpos` (acquire load); the reader
/// touches only `rpos` (release store) and reads `wpos` (acquire load).
pub struct Ring {
    data: UnsafeCell<Box<[f32]>>,
    capacity: usize,
    channels: usize,
    wpos: AtomicUsize,
    rpos: AtomicUsize,
}

// SAFETY: the writer only ever mutates the region of `data` between the
// last-observed `rpos` and its own `wpos`; the reader only ever reads the
// region between the last-observed `rpos` and the acquired `wpos`. Those
// regions never overlap because `free_frames`/`used_frames` bound each
// side to the other's last published index.
unsafe impl Sync for Ring {}

impl Ring {
    /// `capacity` is the total frame slots, not the usable count —
    /// usable capacity is `capacity - 1`.
    pub fn new(capacity: usize, channels: usize) -> Self {
        assert!(capacity >= 2, "ring capacity must allow at least one usable frame");
        assert!(channels >= 1);
        Self {
            data: UnsafeCell::new(vec![0.0_f32; capacity * channels].into_boxed_slice()),
            capacity,
            channels,
            wpos: AtomicUsize::new(0),
            rpos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    fn used_frames(&self, w: usize, r: usize) -> usize {
        (w + self.capacity - r) % self.capacity
    }

    /// Frames currently available to read.
    pub fn used(&self) -> usize {
        let w = self.wpos.load(Ordering::Acquire);
        let r = self.rpos.load(Ordering::Acquire);
        self.used_frames(w, r)
    }

    /// Frames currently available to write.
    pub fn free(&self) -> usize {
        self.capacity - 1 - self.used()
    }

    /// Writes up to `frames` interleaved frames from `src`. Bounded by
    /// free space; any excess beyond capacity is silently dropped.
    /// Returns the number of frames actually written. Call only from the
    /// single producer.
    pub fn write(&self, src: &[f32], frames: usize) -> usize {
        let w = self.wpos.load(Ordering::Relaxed);
        let r = self.rpos.load(Ordering::Acquire);
        let free = self.capacity - 1 - self.used_frames(w, r);
        let to_write = frames.min(free);

        // SAFETY: only the producer writes, and only into slots beyond
        // the last-observed `rpos`, which the reader has already vacated.
        let data = unsafe { &mut *self.data.get() };
        let channels = self.channels;
        for i in 0..to_write {
            let src_base = i * channels;
            let dst_frame = (w + i) % self.capacity;
            let dst_base = dst_frame * channels;
            data[dst_base..dst_base + channels].copy_from_slice(&src[src_base..src_base + channels]);
        }

        let new_w = (w + to_write) % self.capacity;
        self.wpos.store(new_w, Ordering::Release);
        to_write
    }

    /// Reads up to `frames` interleaved frames into `dst`. Returns the
    /// number of frames actually read (`<= used`); the caller zero-fills
    /// any shortfall. Call only from the single consumer.
    pub fn read(&self, dst: &mut [f32], frames: usize) -> usize {
        let r = self.rpos.load(Ordering::Relaxed);
        let w = self.wpos.load(Ordering::Acquire);
        let used = self.used_frames(w, r);
        let to_read = frames.min(used);

        // SAFETY: only the consumer writes `rpos`; it only reads slots
        // already published by the producer's release store of `wpos`.
        let data = unsafe { &*self.data.get() };
        let channels = self.channels;
        for i in 0..to_read {
            let src_frame = (r + i) % self.capacity;
            let src_base = src_frame * channels;
            let dst_base = i * channels;
            dst[dst_base..dst_base + channels].copy_from_slice(&data[src_base..src_base + channels]);
        }

        let new_r = (r + to_read) % self.capacity;
        self.rpos.store(new_r, Ordering::Release);
        to_read
    }
}
