/// Peak tracking automatic gain control.
///
/// The correlation based period search needs spikes from fast DC steps
/// (e.g. the watch moving on the wrist) rejected aggressively. A median
/// based threshold would do that well but needs around a second of sample
/// history, so an exponentially tracked peak is used instead: fast attack,
/// slow release, and anything beyond `peak * threshold` is clipped to zero.
pub struct PeakAgc {
    peak: f32,
    decay: f32,
    boost: f32,
    threshold: f32,
    min_peak: f32,
}

impl PeakAgc {
    pub fn new(start: f32, decay: f32, threshold: f32, min_peak: f32) -> Self {
        Self {
            peak: libm::fabsf(start).max(min_peak),
            decay,
            boost: 1.0 / decay,
            threshold,
            min_peak,
        }
    }

    pub fn step(&mut self, spl: f32) -> f32 {
        // peak tracking, before rejection so the envelope follows steps too
        let mut peak = self.peak;
        if libm::fabsf(spl) > peak {
            peak *= self.boost;
        } else {
            peak *= self.decay;
        }
        peak = peak.max(self.min_peak);
        self.peak = peak;

        if !(peak > 0.0) {
            return 0.0;
        }

        // clipper
        let limit = peak * self.threshold;
        if spl > limit || spl < -limit {
            return 0.0;
        }

        100.0 * spl / (2.0 * peak)
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }
}
