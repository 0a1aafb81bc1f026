//! Test signal builders

use std::f64::consts::PI;

/// One oscillating component of a synthetic signal
#[derive(Debug, Clone, Copy)]
struct Component {
    amplitude: f64,
    frequency: f64,
    phase: f64,
    lifetime: Option<f64>,
}

/// Builder for synthetic measurement traces
pub struct SignalBuilder {
    start: f64,
    end: f64,
    points: usize,
    offset: f64,
    components: Vec<Component>,
    shared_lifetime: Option<f64>,
    noise: f64,
    seed: u64,
}

impl SignalBuilder {
    pub fn new(start: f64, end: f64, points: usize) -> Self {
        Self {
            start,
            end,
            points,
            offset: 0.0,
            components: Vec::new(),
            shared_lifetime: None,
            noise: 0.0,
            seed: 0x2545_f491_4f6c_dd1d,
        }
    }

    pub fn sine(mut self, amplitude: f64, frequency: f64, phase: f64) -> Self {
        self.components.push(Component {
            amplitude,
            frequency,
            phase,
            lifetime: None,
        });
        self
    }

    /// Sine with its own exponential decay
    pub fn decaying_sine(mut self, amplitude: f64, frequency: f64, phase: f64, lifetime: f64) -> Self {
        self.components.push(Component {
            amplitude,
            frequency,
            phase,
            lifetime: Some(lifetime),
        });
        self
    }

    /// Exponential decay applied to the sum of all components
    pub fn shared_decay(mut self, lifetime: f64) -> Self {
        self.shared_lifetime = Some(lifetime);
        self
    }

    pub fn offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Uniform pseudo-noise in `[-level, level]`, reproducible across runs
    pub fn noise(mut self, level: f64) -> Self {
        self.noise = level;
        self
    }

    pub fn x(&self) -> Vec<f64> {
        let step = (self.end - self.start) / (self.points - 1) as f64;
        (0..self.points).map(|i| self.start + step * i as f64).collect()
    }

    pub fn build(self) -> (Vec<f64>, Vec<f64>) {
        let x = self.x();
        let mut state = self.seed;
        let y = x
            .iter()
            .map(|&t| {
                let oscillation: f64 = self
                    .components
                    .iter()
                    .map(|c| {
                        let decay = c.lifetime.map_or(1.0, |tau| (-t / tau).exp());
                        c.amplitude * (2.0 * PI * c.frequency * t + c.phase).sin() * decay
                    })
                    .sum();
                let shared = self.shared_lifetime.map_or(1.0, |tau| (-t / tau).exp());
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
                oscillation * shared + self.offset + self.noise * (2.0 * unit - 1.0)
            })
            .collect();
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_builder() {
        let (x, y) = SignalBuilder::new(0.0, 1.0, 5).sine(1.0, 0.25, 0.0).offset(2.0).build();
        assert_eq!(x, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert!((y[4] - 3.0).abs() < 1e-12);
    }
}
