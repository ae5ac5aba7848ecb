use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ovd_core::{BANDS, CHANNELS};
use ovd_dsp::{BiquadState, Coeffs};

fn bench_biquad_chain_block(c: &mut Criterion) {
    let coeffs = Coeffs::design(48_000.0, 1_000.0, 0.707, 6.0);
    let mut states = [[BiquadState::default(); BANDS]; CHANNELS];
    let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin() * 0.5).collect();

    c.bench_function("biquad_chain_block_512", |b| {
        b.iter(|| {
            for &x in &input {
                for channel in states.iter_mut() {
                    let mut sample = x;
                    for band in channel.iter_mut() {
                        sample = band.process_sample(&coeffs, sample);
                    }
                    black_box(sample);
                }
            }
        })
    });
}

criterion_group!(benches, bench_biquad_chain_block);
criterion_main!(benches);
