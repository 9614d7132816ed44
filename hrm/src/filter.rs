use biquad::Coefficients;

/// Direct Form II biquad.
///
/// `biquad`'s runners implement the transposed form, which has the same
/// transfer function but keeps different state.
pub struct BiquadFilter {
    coeffs: Coefficients<f32>,
    v1: f32,
    v2: f32,
}

impl BiquadFilter {
    pub fn new(coeffs: Coefficients<f32>) -> Self {
        Self {
            coeffs,
            v1: 0.0,
            v2: 0.0,
        }
    }

    /// Coefficients given in the `(b0, b1, b2, a1, a2)` order.
    pub fn from_array(c: [f32; 5]) -> Self {
        Self::new(Coefficients {
            b0: c[0],
            b1: c[1],
            b2: c[2],
            a1: c[3],
            a2: c[4],
        })
    }

    pub fn step(&mut self, x: f32) -> f32 {
        let c = &self.coeffs;
        let v1 = self.v1;
        let v2 = self.v2;

        let v = x - c.a1 * v1 - c.a2 * v2;
        let y = c.b0 * v + c.b1 * v1 + c.b2 * v2;

        self.v2 = v1;
        self.v1 = v;
        y
    }

    pub fn reset(&mut self) {
        self.v1 = 0.0;
        self.v2 = 0.0;
    }

    /// Gain for a constant input, `(b0 + b1 + b2) / (1 + a1 + a2)`.
    pub fn dc_gain(&self) -> f32 {
        let c = &self.coeffs;
        (c.b0 + c.b1 + c.b2) / (1.0 + c.a1 + c.a2)
    }

    pub fn state(&self) -> (f32, f32) {
        (self.v1, self.v2)
    }
}
