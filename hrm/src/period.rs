use crate::{BPM, SAMPLE_RATE_HZ};

/// Shifts searched for the first cycle, ~210 down to 30 bpm at 24Hz.
pub const FIRST_CYCLE_SHIFTS: (usize, usize) = (7, 48);

/// Sum of squared differences between the samples and a copy of
/// themselves shifted by `shift`. Small when `shift` is a period of the
/// signal. Zero if the two copies do not overlap.
pub fn dissimilarity(samples: &[i8], shift: usize) -> u32 {
    let shifted = match samples.get(shift..) {
        Some(s) => s,
        None => return 0,
    };

    let mut e = 0u32;
    for (s1, s2) in shifted.iter().zip(samples.iter()) {
        let d = *s1 as i32 - *s2 as i32;
        e += (d * d) as u32;
    }
    e
}

/// Find the first strict local minimum of `metric` with its position in
/// `min_shift..=max_shift`. Plateaus and minima on the range boundary are
/// not reported.
pub fn find_trough_by(
    min_shift: usize,
    max_shift: usize,
    mut metric: impl FnMut(usize) -> u32,
) -> Option<usize> {
    if min_shift == 0 || max_shift < min_shift {
        return None;
    }

    let mut z2 = metric(min_shift - 1);
    let mut z1 = metric(min_shift);
    for shift in min_shift + 1..=max_shift + 1 {
        let z = metric(shift);
        if z2 > z1 && z1 < z {
            return Some(shift - 1);
        }
        z2 = z1;
        z1 = z;
    }
    None
}

pub fn find_trough(samples: &[i8], min_shift: usize, max_shift: usize) -> Option<usize> {
    find_trough_by(min_shift, max_shift, |shift| dissimilarity(samples, shift))
}

/// Troughs found for successive cardiac cycles, each in samples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Periods {
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub t3: Option<usize>,
}

fn cycles_to_bpm(cycles: usize, period: usize) -> BPM {
    BPM(((60 * SAMPLE_RATE_HZ as usize * cycles) / period) as u16)
}

impl Periods {
    pub fn bpm(&self) -> BPM {
        match self.t3 {
            Some(t3) => cycles_to_bpm(4, t3),
            None => cycles_to_bpm(3, self.t2),
        }
    }
}

/// Locate the heartbeat period, refining over up to four cycles.
///
/// A single cycle trough is noisy and may lock on to a harmonic, so the
/// second and third cycles must be found as well. The fourth is optional
/// and only adds precision.
pub fn estimate_periods(samples: &[i8]) -> Option<Periods> {
    let (lo, hi) = FIRST_CYCLE_SHIFTS;
    let Some(t0) = find_trough(samples, lo, hi) else {
        defmt_or_log::debug!("hrm: no first cycle trough");
        return None;
    };

    let t1 = t0 * 2;
    let Some(t1) = find_trough(samples, t1 - 5, t1 + 5) else {
        defmt_or_log::debug!("hrm: t0 = {}, no second cycle", t0);
        return None;
    };

    let t2 = (t1 * 3) / 2;
    let Some(t2) = find_trough(samples, t2 - 5, t2 + 4) else {
        defmt_or_log::debug!("hrm: t0 = {}, t1 = {}, no third cycle", t0, t1);
        return None;
    };

    let t3 = (t2 * 4) / 3;
    let t3 = find_trough(samples, t3 - 4, t3 + 4);

    defmt_or_log::debug!("hrm: t0 = {}, t1 = {}, t2 = {}, t3 = {:?}", t0, t1, t2, t3);
    Some(Periods { t0, t1, t2, t3 })
}

pub fn estimate(samples: &[i8]) -> Option<BPM> {
    estimate_periods(samples).map(|p| p.bpm())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(period: usize, amplitude: f32, len: usize) -> Vec<i8> {
        (0..len)
            .map(|i| {
                let phase = 2.0 * core::f32::consts::PI * i as f32 / period as f32;
                (amplitude * phase.sin()) as i8
            })
            .collect()
    }

    #[test]
    fn periodic_buffer_has_zero_dissimilarity() {
        let saw = (0..60).map(|i| (i % 6) as i8 * 10 - 25).collect::<Vec<_>>();
        assert_eq!(dissimilarity(&saw, 6), 0);
        assert_eq!(dissimilarity(&saw, 12), 0);
        assert!(dissimilarity(&saw, 3) > 0);
        assert!(dissimilarity(&saw, 5) > 0);
    }

    #[test]
    fn dissimilarity_handles_extremes() {
        let d = [-128i8, 127, -128, 127];
        assert_eq!(dissimilarity(&d, 1), 3 * 255 * 255);
        assert_eq!(dissimilarity(&d, 2), 0);
        assert_eq!(dissimilarity(&d, 4), 0);
        assert_eq!(dissimilarity(&d, 100), 0);
        assert_eq!(dissimilarity(&d, 0), 0);
    }

    #[track_caller]
    fn run_test_curve(curve: &[u32], min: usize, max: usize, expected: Option<usize>) {
        assert_eq!(find_trough_by(min, max, |s| curve[s]), expected);
    }

    #[test]
    fn trough_of_synthetic_curve() {
        let curve = [50, 40, 30, 20, 10, 15, 25, 35, 45];
        run_test_curve(&curve, 1, 7, Some(4));
        run_test_curve(&curve, 4, 4, Some(4));
        run_test_curve(&curve, 5, 7, None);
        run_test_curve(&curve, 1, 3, None);

        // first trough wins
        let curve = [9, 5, 9, 1, 9];
        run_test_curve(&curve, 1, 3, Some(1));
        run_test_curve(&curve, 2, 3, Some(3));
    }

    #[test]
    fn no_trough_in_monotonic_or_flat_curve() {
        let rising = (0..20).collect::<Vec<u32>>();
        run_test_curve(&rising, 1, 18, None);
        let falling = (0..20).rev().collect::<Vec<u32>>();
        run_test_curve(&falling, 1, 18, None);
        run_test_curve(&[7; 20], 1, 18, None);
        run_test_curve(&[9, 4, 4, 9], 1, 2, None);
    }

    #[test]
    fn degenerate_ranges() {
        let curve = [3, 1, 3];
        run_test_curve(&curve, 0, 1, None);
        run_test_curve(&curve, 2, 1, None);
    }

    #[test]
    fn trough_at_signal_period() {
        let d = sine(20, 60.0, 240);
        assert_eq!(find_trough(&d, 7, 48), Some(20));
        assert_eq!(find_trough(&d, 35, 45), Some(40));
    }

    #[track_caller]
    fn run_test_estimate(period: usize, bpm: u16) {
        let d = sine(period, 60.0, 240);
        let periods = estimate_periods(&d).unwrap();
        assert_eq!(
            periods,
            Periods {
                t0: period,
                t1: 2 * period,
                t2: 3 * period,
                t3: Some(4 * period),
            }
        );
        assert_eq!(periods.bpm().0, bpm);
        assert_eq!(estimate(&d).map(|b| b.0), Some(bpm));
    }

    #[test]
    fn estimate_clean_sines() {
        run_test_estimate(12, 120);
        run_test_estimate(16, 90);
        run_test_estimate(20, 72);
        run_test_estimate(24, 60);
        run_test_estimate(32, 45);
    }

    #[test]
    fn estimate_at_first_cycle_limits() {
        run_test_estimate(7, 205);
        run_test_estimate(48, 30);
    }

    #[test]
    fn fourth_cycle_is_optional() {
        // too short to hold a fourth 40 sample cycle
        let d = sine(40, 60.0, 155);
        let periods = estimate_periods(&d).unwrap();
        assert_eq!(periods.t2, 120);
        assert_eq!(periods.t3, None);
        assert_eq!(periods.bpm().0, 36);
    }

    #[cfg(feature = "log")]
    #[test]
    fn stage_results_are_logged() {
        use crate::test_log;

        test_log::capture();
        estimate_periods(&sine(20, 60.0, 240));
        assert_eq!(
            test_log::matching(log::Level::Debug, "t0 = "),
            ["hrm: t0 = 20, t1 = 40, t2 = 60, t3 = Some(80)"]
        );

        test_log::capture();
        estimate_periods(&sine(40, 60.0, 155));
        assert_eq!(
            test_log::matching(log::Level::Debug, "t0 = "),
            ["hrm: t0 = 40, t1 = 80, t2 = 120, t3 = None"]
        );

        test_log::capture();
        estimate_periods(&[0; 240]);
        assert_eq!(
            test_log::matching(log::Level::Debug, "no first cycle").len(),
            1
        );
    }

    #[test]
    fn flat_signal_has_no_estimate() {
        assert_eq!(estimate_periods(&[0; 240]), None);
        assert_eq!(estimate_periods(&[17; 240]), None);
    }

    #[test]
    fn bpm_conversion() {
        let p = Periods {
            t0: 20,
            t1: 40,
            t2: 61,
            t3: None,
        };
        assert_eq!(p.bpm().0, (60 * 24 * 3) / 61);
        let p = Periods {
            t3: Some(81),
            ..p
        };
        assert_eq!(p.bpm().0, (60 * 24 * 4) / 81);
    }
}
