//! Microphone level shaping
//!
//! OBS reports per-channel `[magnitude, peak, input_peak]` multipliers. The
//! overlay wants one 0..1 value with a noise gate and some gain.

/// Noise gate and gain for the relayed microphone level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMeter {
    pub threshold: f32,
    pub gain: f32,
}

impl Default for AudioMeter {
    fn default() -> Self {
        Self {
            threshold: 0.01,
            gain: 3.0,
        }
    }
}

impl AudioMeter {
    /// Loudest channel peak, gated and amplified into 0..=1
    pub fn level(&self, channels: &[[f32; 3]]) -> f32 {
        let peak = channels
            .iter()
            .map(|ch| ch[1])
            .filter(|v| v.is_finite())
            .fold(0.0f32, f32::max);
        self.shape(peak)
    }

    pub fn shape(&self, raw: f32) -> f32 {
        if !raw.is_finite() || raw < self.threshold {
            return 0.0;
        }
        ((raw - self.threshold) * self.gain).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_gate() {
        let meter = AudioMeter::default();
        assert_eq!(meter.shape(0.005), 0.0);
        assert_eq!(meter.shape(f32::NAN), 0.0);
        assert!((meter.shape(0.11) - 0.3).abs() < 1e-5);
        assert_eq!(meter.shape(0.9), 1.0);
    }

    #[test]
    fn test_loudest_channel_wins() {
        let meter = AudioMeter::default();
        let level = meter.level(&[[0.02, 0.05, 0.05], [0.1, 0.21, 0.3]]);
        assert!((level - 0.6).abs() < 1e-5);
        assert_eq!(meter.level(&[]), 0.0);
    }
}
