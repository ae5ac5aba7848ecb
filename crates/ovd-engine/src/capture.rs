use ovd_core::{BANDS, CHANNELS, CLIP_CEILING};
use ovd_dsp::{BiquadState, Table};

/// Per-channel, per-band running filter state, owned by the capture
/// callback alone.
pub type ChannelStates = [[BiquadState; BANDS]; CHANNELS];

pub fn new_channel_states() -> ChannelStates {
    [[BiquadState::default(); BANDS]; CHANNELS]
}

pub fn reset_channel_states(states: &mut ChannelStates) {
    for channel in states.iter_mut() {
        for band in channel.iter_mut() {
            band.reset();
        }
    }
}

/// Processes one block of up to `BLOCK_FRAMES` interleaved input frames:
/// applies master gain, runs the per-channel biquad chain using the
/// currently published coefficient table, and soft-clips the result into
/// `output`. Pulled out of the real-time callback closure so it can be
/// exercised without a running graph.
///
/// `input` and `output` must each hold at least `frames * channels`
/// samples; `channels` must not exceed [`CHANNELS`] — any excess input
/// channels are left untouched in `output`.
pub fn process_block(
    input: &[f32],
    output: &mut [f32],
    frames: usize,
    channels: usize,
    master_gain: f32,
    coeffs: &Table,
    states: &mut ChannelStates,
) {
    let active_channels = channels.min(CHANNELS);
    for i in 0..frames {
        for ch in 0..active_channels {
            let idx = i * channels + ch;
            let mut x = input[idx] * master_gain;
            for band in 0..BANDS {
                x = states[ch][band].process_sample(&coeffs[ch][band], x);
            }
            output[idx] = x.clamp(-CLIP_CEILING, CLIP_CEILING);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ovd_dsp::CoefficientTable;

    fn interleaved(values: &[f32]) -> Vec<f32> {
        // duplicate into stereo so both channels carry the same signal
        values.iter().flat_map(|&v| [v, v]).collect()
    }

    #[test]
    fn unity_setup_passes_signal_through_after_warmup() {
        let table = CoefficientTable::new(); // identity coefficients
        let mut states = new_channel_states();
        let samples: Vec<f32> = (0..1024)
            .map(|i| if i % 2 == 0 { 0.1 } else { -0.2 })
            .collect();
        let input = interleaved(&samples);
        let mut output = vec![0.0_f32; input.len()];

        process_block(&input, &mut output, samples.len(), 2, 1.0, table.current(), &mut states);

        for i in 20..samples.len() {
            assert_relative_eq!(output[i * 2], samples[i], epsilon = 1e-5);
            assert_relative_eq!(output[i * 2 + 1], samples[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn output_is_always_clipped_to_ceiling() {
        let table = CoefficientTable::new();
        let mut states = new_channel_states();
        let samples = vec![1.5_f32; 64];
        let input = interleaved(&samples);
        let mut output = vec![0.0_f32; input.len()];

        process_block(&input, &mut output, samples.len(), 2, 1.0, table.current(), &mut states);

        for &y in &output {
            assert!(y.abs() <= CLIP_CEILING);
        }
        // sustained +1.5 input settles at the clip ceiling
        assert_relative_eq!(output[output.len() - 1], CLIP_CEILING, epsilon = 1e-4);
    }

    #[test]
    fn master_attenuation_scales_rms() {
        let table = CoefficientTable::new();
        let mut states = new_channel_states();
        let samples: Vec<f32> = (0..256).map(|i| (i as f32 * 0.05).sin() * 0.3).collect();
        let input = interleaved(&samples);
        let mut output = vec![0.0_f32; input.len()];
        let master = ovd_core::gain_from_bits(ovd_core::gain_bits_from_db(-20.0));

        process_block(&input, &mut output, samples.len(), 2, master, table.current(), &mut states);

        let rms = |xs: &[f32]| (xs.iter().map(|x| x * x).sum::<f32>() / xs.len() as f32).sqrt();
        let in_rms = rms(&samples);
        let out_rms = rms(&samples.iter().zip(output.iter().step_by(2)).map(|(_, &o)| o).collect::<Vec<_>>());
        assert_relative_eq!(out_rms, in_rms * 0.1, epsilon = in_rms * 0.1 * 0.01 + 1e-6);
    }

    #[test]
    fn ignores_channels_beyond_declared_stereo_count() {
        let table = CoefficientTable::new();
        let mut states = new_channel_states();
        let frames = 4;
        let input = vec![0.2_f32; frames * 3]; // 3-channel input, engine only stereo
        let mut output = vec![9.0_f32; frames * 3];

        process_block(&input, &mut output, frames, 3, 1.0, table.current(), &mut states);

        for i in 0..frames {
            assert_relative_eq!(output[i * 3], 0.2, epsilon = 1e-5);
            assert_relative_eq!(output[i * 3 + 1], 0.2, epsilon = 1e-5);
            assert_eq!(output[i * 3 + 2], 9.0); // third channel left untouched
        }
    }
}
