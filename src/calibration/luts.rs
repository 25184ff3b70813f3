//! Per-channel lookup tables that approximate a color transform.

use std::sync::Arc;


/// Three 256 entry tables, one per output channel.
#[derive(Clone, PartialEq, Eq)]
pub struct RgbLuts {
    pub red: [u8; 256],
    pub green: [u8; 256],
    pub blue: [u8; 256],
}

impl RgbLuts {

    /// Tables that map every value to itself.
    /// Note that `Calibration::Identity`, not this value, means "no calibration".
    pub fn identity() -> Self {
        let mut curve = [0_u8; 256];
        for (index, value) in curve.iter_mut().enumerate() { *value = index as u8; }
        RgbLuts { red: curve, green: curve, blue: curve }
    }

    /// Look up all three channels.
    #[inline]
    pub fn apply(&self, [red, green, blue]: [u8; 3]) -> [u8; 3] {
        [ self.red[red as usize], self.green[green as usize], self.blue[blue as usize] ]
    }
}

impl std::fmt::Debug for RgbLuts {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("RgbLuts").finish_non_exhaustive()
    }
}


/// Whether and how raw color values are calibrated before output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Calibration {

    /// Raw values are used unchanged, and heuristic corrections may apply.
    Identity,

    /// Raw values are replaced through sampled tables.
    /// Stays a calibration even if the tables happen to map every value to itself.
    Luts(Arc<RgbLuts>),
}

impl Calibration {

    /// Whether this is the "no calibration" variant.
    pub fn is_identity(&self) -> bool {
        matches!(self, Calibration::Identity)
    }

    /// The tables, unless this is the identity.
    pub fn luts(&self) -> Option<&RgbLuts> {
        match self {
            Calibration::Identity => None,
            Calibration::Luts(luts) => Some(luts),
        }
    }

    /// Calibrate one color.
    #[inline]
    pub fn apply(&self, rgb: [u8; 3]) -> [u8; 3] {
        match self {
            Calibration::Identity => rgb,
            Calibration::Luts(luts) => luts.apply(rgb),
        }
    }
}


/// Collects the sampled output for every raw input value of each channel.
pub struct LutAccumulator {
    sums: [[u64; 256]; 3],
    counts: [[u32; 256]; 3],
}

impl Default for LutAccumulator {
    fn default() -> Self {
        LutAccumulator { sums: [[0; 256]; 3], counts: [[0; 256]; 3] }
    }
}

impl LutAccumulator {

    /// Record that the raw values `input` produced the calibrated values `output`.
    pub fn add(&mut self, input: [u8; 3], output: [u8; 3]) {
        for channel in 0 .. 3 {
            let index = input[channel] as usize;
            self.sums[channel][index] += output[channel] as u64;
            self.counts[channel][index] += 1;
        }
    }

    /// Number of samples recorded.
    pub fn sample_count(&self) -> u64 {
        self.counts[0].iter().map(|&count| count as u64).sum()
    }

    /// Average the samples and fill the gaps.
    pub fn build(&self) -> RgbLuts {
        RgbLuts {
            red: build_curve(&self.sums[0], &self.counts[0]),
            green: build_curve(&self.sums[1], &self.counts[1]),
            blue: build_curve(&self.sums[2], &self.counts[2]),
        }
    }
}


/// Average every sampled entry, interpolate linearly between sampled entries,
/// and extend the first and last sampled entry to the ends.
/// Without any samples, the curve is the identity.
pub fn build_curve(sums: &[u64; 256], counts: &[u32; 256]) -> [u8; 256] {
    let mut curve = [0_u8; 256];
    let sampled: Vec<usize> = (0 .. 256).filter(|&index| counts[index] > 0).collect();

    let (first, last) = match (sampled.first(), sampled.last()) {
        (Some(&first), Some(&last)) => (first, last),

        _ => {
            for (index, value) in curve.iter_mut().enumerate() { *value = index as u8; }
            return curve;
        }
    };

    for &index in &sampled {
        curve[index] = (sums[index] / counts[index] as u64).min(255) as u8;
    }

    for pair in sampled.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let (from, to) = (curve[start] as f32, curve[end] as f32);

        for index in start + 1 .. end {
            let t = (index - start) as f32 / (end - start) as f32;
            curve[index] = (from + (to - from) * t + 0.5) as u8;
        }
    }

    let (first_value, last_value) = (curve[first], curve[last]);
    curve[.. first].fill(first_value);
    curve[last + 1 ..].fill(last_value);

    curve
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn identity_is_idempotent(){
        for value in 0 ..= 255_u8 {
            assert_eq!(Calibration::Identity.apply([value, value, 255 - value]), [value, value, 255 - value]);
        }
    }

    #[test]
    fn identity_tables_are_not_the_identity_variant(){
        let calibration = Calibration::Luts(Arc::new(RgbLuts::identity()));
        assert!(!calibration.is_identity());
        assert!(Calibration::Identity.is_identity());
        assert_eq!(calibration.apply([1, 2, 3]), [1, 2, 3]);
    }

    #[test]
    fn curve_averages_and_interpolates(){
        let mut sums = [0_u64; 256];
        let mut counts = [0_u32; 256];

        sums[10] = 30 + 31; counts[10] = 2; // averages to 30, rounding down
        sums[20] = 50; counts[20] = 1;

        let curve = build_curve(&sums, &counts);
        assert_eq!(curve[0], 30);
        assert_eq!(curve[10], 30);
        assert_eq!(curve[15], 40);
        assert_eq!(curve[11], 32);
        assert_eq!(curve[20], 50);
        assert_eq!(curve[255], 50);
    }

    #[test]
    fn empty_curve_is_identity(){
        let curve = build_curve(&[0; 256], &[0; 256]);
        assert!(curve.iter().enumerate().all(|(index, &value)| index == value as usize));

        let accumulator = LutAccumulator::default();
        assert_eq!(accumulator.sample_count(), 0);
        assert!(accumulator.build() == RgbLuts::identity());
    }
}
