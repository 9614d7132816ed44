//! Heart rate estimation from a wrist PPG sensor sampled at 24Hz.
//!
//! Raw samples go through offset removal, a high pass biquad, a peak
//! tracking AGC and a low pass biquad before being quantized into a short
//! history. The heart rate is the period at which that history best
//! repeats itself, found by a self-similarity scan over several cycles.
#![cfg_attr(not(test), no_std)]

pub mod agc;
pub mod buffer;
pub mod config;
pub mod filter;
pub mod period;
pub mod session;

#[cfg(all(test, feature = "log"))]
mod test_log;

pub use agc::PeakAgc;
pub use buffer::{SampleBuffer, SAMPLE_CAPACITY};
pub use config::{ConfigError, PpgConfig};
pub use filter::BiquadFilter;
pub use period::{
    dissimilarity, estimate, estimate_periods, find_trough, find_trough_by, Periods,
};
pub use session::{PpgSession, PpgSource, TraceSink, MIN_ESTIMATE_SAMPLES, READY_SAMPLES};

/// Every period to rate conversion assumes this cadence.
pub const SAMPLE_RATE_HZ: u32 = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BPM(pub u16);
