use crate::{
    agc::PeakAgc,
    buffer::SampleBuffer,
    config::{ConfigError, PpgConfig},
    filter::BiquadFilter,
    period, BPM,
};

/// Below this many samples no estimate is attempted and nothing is cleared.
pub const MIN_ESTIMATE_SAMPLES: usize = 200;
/// Ten seconds of history, the point at which hosts should ask for a rate.
pub const READY_SAMPLES: usize = 240;

/// Raw PPG magnitudes from the sensor driver, one per call.
pub trait PpgSource {
    fn read_ppg(&mut self) -> u16;
}

/// Receives every sample that passes through a session, e.g. to store raw
/// sensor data for offline analysis.
pub trait TraceSink {
    fn record_sample(&mut self, raw: u16, processed: i8);
}

impl TraceSink for () {
    fn record_sample(&mut self, _raw: u16, _processed: i8) {}
}

/// Heart rate estimation state for one period of sensing.
///
/// Must be fed at 24Hz. Dropping the session is all that is needed when
/// sensing stops.
pub struct PpgSession {
    offset: f32,
    hpf: BiquadFilter,
    agc: PeakAgc,
    lpf: BiquadFilter,
    samples: SampleBuffer,
}

impl PpgSession {
    /// `offset` is a sensor reading taken before streaming starts and is
    /// the DC reference for the whole session.
    pub fn new(offset: u16) -> Self {
        Self::from_config(offset, &PpgConfig::default())
    }

    pub fn with_config(offset: u16, config: &PpgConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_config(offset, config))
    }

    fn from_config(offset: u16, config: &PpgConfig) -> Self {
        Self {
            offset: offset as f32,
            hpf: BiquadFilter::from_array(config.hpf),
            agc: PeakAgc::new(
                config.agc_start,
                config.agc_decay,
                config.agc_threshold,
                config.agc_min_peak,
            ),
            lpf: BiquadFilter::from_array(config.lpf),
            samples: SampleBuffer::new(),
        }
    }

    /// Start a session using the next sensor reading as offset.
    pub fn start(source: &mut impl PpgSource) -> Self {
        Self::new(source.read_ppg())
    }

    pub fn preprocess(&mut self, raw: u16) -> i8 {
        self.preprocess_traced(raw, &mut ())
    }

    /// Run one raw sample through the filter chain and store the result.
    ///
    /// The returned value is nominally within -100..=100 and is meant for
    /// display.
    pub fn preprocess_traced(&mut self, raw: u16, trace: &mut impl TraceSink) -> i8 {
        let spl = raw as f32 - self.offset;
        let spl = self.hpf.step(spl);
        let spl = self.agc.step(spl);
        let spl = self.lpf.step(spl);
        let spl = quantize(spl);

        self.samples.push(spl);
        trace.record_sample(raw, spl);
        spl
    }

    pub fn poll(&mut self, source: &mut impl PpgSource) -> i8 {
        self.preprocess(source.read_ppg())
    }

    pub fn samples(&self) -> &[i8] {
        self.samples.as_slice()
    }

    pub fn is_ready(&self) -> bool {
        self.samples.len() >= READY_SAMPLES
    }

    /// Estimate the heart rate from the accumulated samples.
    ///
    /// Returns `None` without touching the history if there is too little
    /// of it. Otherwise the history is discarded whatever the outcome, so
    /// the next estimate starts from scratch.
    pub fn get_heart_rate(&mut self) -> Option<BPM> {
        if self.samples.len() < MIN_ESTIMATE_SAMPLES {
            return None;
        }

        let hr = period::estimate(self.samples.as_slice());
        self.samples.clear();

        if let Some(bpm) = hr {
            defmt_or_log::debug!("hrm: {} bpm", bpm.0);
        } else {
            defmt_or_log::debug!("hrm: no estimate");
        }
        hr
    }
}

// Truncates towards zero, saturating at the limits of the sample type.
fn quantize(v: f32) -> i8 {
    (v as i32).clamp(i8::MIN as i32, i8::MAX as i32) as i8
}
