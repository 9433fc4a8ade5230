//! Energy gate: classifies one analysis window by its RMS level.
//!
//! ## Algorithm
//!
//! 1. Compute RMS of the window: `sqrt(sum(x²) / len)`.
//! 2. If RMS < `threshold` → `Quiet`.
//! 3. Otherwise → `Loud`.
//!
//! Unlike a speech VAD there is no hangover: the minimum-duration gate in
//! [`detect`](super::detect) already suppresses short dips.

/// Whether a given analysis window counts towards a silent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    /// RMS strictly below threshold.
    Quiet,
    /// RMS at or above threshold.
    Loud,
}

impl WindowDecision {
    pub fn is_quiet(self) -> bool {
        self == WindowDecision::Quiet
    }
}

/// Stateless RMS threshold classifier.
#[derive(Debug, Clone, Copy)]
pub struct EnergyGate {
    /// RMS amplitude threshold. Windows below this are quiet.
    /// Typical range: 0.01–0.05 for speech-heavy video.
    threshold: f32,
}

impl EnergyGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn classify(&self, window: &[f32]) -> WindowDecision {
        if rms(window) < self.threshold {
            WindowDecision::Quiet
        } else {
            WindowDecision::Loud
        }
    }
}

impl Default for EnergyGate {
    fn default() -> Self {
        Self::new(0.02)
    }
}

/// Compute the root-mean-square of a sample slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_below_threshold() {
        let gate = EnergyGate::new(0.02);
        assert_eq!(gate.classify(&[0.0; 1024]), WindowDecision::Quiet);
    }

    #[test]
    fn loud_above_threshold() {
        let gate = EnergyGate::new(0.02);
        assert_eq!(gate.classify(&[0.5; 1024]), WindowDecision::Loud);
    }

    #[test]
    fn threshold_is_strict() {
        // RMS exactly at threshold is not quiet.
        let gate = EnergyGate::new(0.25);
        assert_eq!(gate.classify(&[0.25; 64]), WindowDecision::Loud);
    }

    #[test]
    fn zero_threshold_never_quiet() {
        let gate = EnergyGate::new(0.0);
        assert!(!gate.classify(&[0.0; 16]).is_quiet());
    }

    #[test]
    fn rms_of_square_wave() {
        // A square wave at ±0.5 should have RMS = 0.5
        let samples: Vec<f32> = (0..256)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let rms = rms(&samples);
        assert!((rms - 0.5).abs() < 1e-5, "rms={rms}");
    }

    #[test]
    fn rms_of_empty_window_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }
}
