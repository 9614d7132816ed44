use core::fmt;

/// Tuning of the preprocessing chain.
///
/// Plain old data so it can be stored as raw bytes alongside the other
/// settings of a host.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PpgConfig {
    /// High pass biquad, `(b0, b1, b2, a1, a2)`.
    pub hpf: [f32; 5],
    /// Low pass biquad, `(b0, b1, b2, a1, a2)`.
    pub lpf: [f32; 5],
    pub agc_start: f32,
    pub agc_decay: f32,
    pub agc_threshold: f32,
    /// Lower bound for the tracked peak, keeps the gain finite over silence.
    pub agc_min_peak: f32,
}

impl Default for PpgConfig {
    fn default() -> Self {
        Self {
            hpf: [0.87033078, -1.74066156, 0.87033078, -1.72377617, 0.75754694],
            lpf: [0.11595249, 0.23190498, 0.11595249, -0.72168143, 0.18549138],
            agc_start: 20.0,
            agc_decay: 0.971,
            agc_threshold: 2.0,
            agc_min_peak: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config has the wrong size.
    Length { got: usize, expected: usize },
    /// A filter coefficient is NaN or infinite.
    NonFiniteCoefficient,
    /// AGC decay must lie strictly between 0 and 1.
    Decay,
    Threshold,
    Peak,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Length { got, expected } => {
                write!(f, "config has {} bytes, expected {}", got, expected)
            }
            ConfigError::NonFiniteCoefficient => write!(f, "non-finite filter coefficient"),
            ConfigError::Decay => write!(f, "agc decay must be in (0, 1)"),
            ConfigError::Threshold => write!(f, "agc threshold must be positive"),
            ConfigError::Peak => write!(f, "agc start and min peak must be non-negative"),
        }
    }
}

impl PpgConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hpf.iter().chain(self.lpf.iter()).all(|c| c.is_finite()) {
            return Err(ConfigError::NonFiniteCoefficient);
        }
        if !(self.agc_decay > 0.0 && self.agc_decay < 1.0) {
            return Err(ConfigError::Decay);
        }
        if !(self.agc_threshold > 0.0) {
            return Err(ConfigError::Threshold);
        }
        if !(self.agc_start >= 0.0 && self.agc_min_peak >= 0.0) {
            return Err(ConfigError::Peak);
        }
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let expected = core::mem::size_of::<Self>();
        if bytes.len() != expected {
            return Err(ConfigError::Length {
                got: bytes.len(),
                expected,
            });
        }
        let config: Self = bytemuck::pod_read_unaligned(bytes);
        config.validate()?;
        Ok(config)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
