use crate::ring::Ring;

/// Fallback frame count used when the graph runtime reports a zero
/// `chunk.size` (i.e. "give me whatever you think is reasonable").
pub const FALLBACK_FRAMES: usize = 128;

/// Determines how many frames the playback callback should produce this
/// cycle: `chunk.size / stride` if positive, otherwise
/// [`FALLBACK_FRAMES`], clamped so the result never exceeds
/// `maxsize / stride`.
pub fn requested_frames(chunk_size: usize, stride: usize, maxsize: usize) -> usize {
    let stride = stride.max(1);
    let requested = if chunk_size > 0 { chunk_size / stride } else { FALLBACK_FRAMES };
    requested.min(maxsize / stride)
}

/// Reads up to `frames` interleaved frames from `ring` into `dst`,
/// zero-filling any shortfall on underrun. Returns the number of frames
/// actually read from the ring (the caller still reports `frames * stride`
/// as the chunk size — the zero-fill makes the tail valid silence).
pub fn fill_from_ring(ring: &Ring, dst: &mut [f32], frames: usize) -> usize {
    let channels = ring.channels();
    let read = ring.read(dst, frames);
    if read < frames {
        let start = read * channels;
        let end = frames * channels;
        for sample in &mut dst[start..end] {
            *sample = 0.0;
        }
    }
    read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_frames_uses_chunk_size_when_positive() {
        assert_eq!(requested_frames(2048, 8, 100_000), 256);
    }

    #[test]
    fn requested_frames_falls_back_when_chunk_size_zero() {
        assert_eq!(requested_frames(0, 8, 100_000), FALLBACK_FRAMES);
    }

    #[test]
    fn requested_frames_is_clamped_to_maxsize() {
        assert_eq!(requested_frames(100_000, 8, 80), 10);
    }

    #[test]
    fn zero_stride_does_not_panic() {
        assert_eq!(requested_frames(0, 0, 0), FALLBACK_FRAMES.min(0));
    }

    #[test]
    fn underrun_zero_fills_tail() {
        let ring = Ring::new(16, 2);
        ring.write(&[1.0, 1.0, 2.0, 2.0], 2);
        let mut dst = vec![9.0_f32; 5 * 2];
        let read = fill_from_ring(&ring, &mut dst, 5);
        assert_eq!(read, 2);
        assert_eq!(&dst[..4], &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(&dst[4..], &[0.0; 6]);
    }

    #[test]
    fn full_read_leaves_no_zero_fill() {
        let ring = Ring::new(16, 1);
        ring.write(&[1.0, 2.0, 3.0], 3);
        let mut dst = vec![9.0_f32; 3];
        let read = fill_from_ring(&ring, &mut dst, 3);
        assert_eq!(read, 3);
        assert_eq!(dst, vec![1.0, 2.0, 3.0]);
    }
}
