use ovd_core::DEFAULT_Q;

/// Normalized (by `a0`) biquad coefficients for one peaking filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl Coeffs {
    /// Unity-gain, all-pass-through coefficients. Never produced by
    /// `design`, used only as a table-initialization placeholder.
    pub const IDENTITY: Self = Self { b0: 1.0, b1: 0.0, b2: 0.0, a1: 0.0, a2: 0.0 };

    /// Designs a peaking-EQ biquad via the RBJ audio-cookbook formula,
    /// normalized by `a0`. Out-of-range inputs are clamped rather than
    /// rejected:
    /// - `fs <= 0` becomes 48000
    /// - `f0 <= 0` becomes 10
    /// - `f0 > 0.49 * fs` becomes `0.49 * fs`
    /// - `q <= 0` becomes the default Q
    pub fn design(fs: f32, f0: f32, q: f32, gain_db: f32) -> Self {
        let fs = if fs <= 0.0 { 48_000.0 } else { fs };
        let f0 = if f0 <= 0.0 { 10.0 } else { f0.min(0.49 * fs) };
        let q = if q <= 0.0 { DEFAULT_Q } else { q };

        let a = 10f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * f0 / fs;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a;

        Self { b0: b0 / a0, b1: b1 / a0, b2: b2 / a0, a1: a1 / a0, a2: a2 / a0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_gain_is_unity_peaking() {
        let c = Coeffs::design(48_000.0, 1_000.0, 0.707, 0.0);
        assert_relative_eq!(c.b0, 1.0, epsilon = 1e-5);
        assert_relative_eq!(c.b1, c.a1, epsilon = 1e-5);
        assert_relative_eq!(c.b2, c.a2, epsilon = 1e-5);
    }

    #[test]
    fn clamps_nonpositive_sample_rate() {
        let default_fs = Coeffs::design(48_000.0, 1_000.0, 0.707, 6.0);
        let clamped = Coeffs::design(-1.0, 1_000.0, 0.707, 6.0);
        assert_relative_eq!(default_fs.b0, clamped.b0, epsilon = 1e-6);
    }

    #[test]
    fn clamps_frequency_above_nyquist_fraction() {
        let at_limit = Coeffs::design(48_000.0, 0.49 * 48_000.0, 0.707, 6.0);
        let above_limit = Coeffs::design(48_000.0, 40_000.0, 0.707, 6.0);
        assert_relative_eq!(at_limit.b0, above_limit.b0, epsilon = 1e-6);
    }

    #[test]
    fn clamps_nonpositive_q_to_default() {
        let default_q = Coeffs::design(48_000.0, 1_000.0, DEFAULT_Q, 6.0);
        let clamped = Coeffs::design(48_000.0, 1_000.0, -3.0, 6.0);
        assert_relative_eq!(default_q.b0, clamped.b0, epsilon = 1e-6);
    }

    #[test]
    fn boost_and_cut_are_symmetric_about_unity() {
        let boost = Coeffs::design(48_000.0, 1_000.0, 0.707, 6.0);
        let cut = Coeffs::design(48_000.0, 1_000.0, 0.707, -6.0);
        assert!(boost.b0 > 1.0);
        assert!(cut.b0 < 1.0);
    }
}
