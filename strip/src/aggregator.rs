use crate::layout::BandSpec;

/// Sums consecutive runs of magnitude samples into `N` bands.
pub struct BandAggregator<const N: usize> {
    bin_sum_counts: [usize; N],
}

impl<const N: usize> BandAggregator<N> {
    pub fn new(specs: &[BandSpec; N]) -> Self {
        Self {
            bin_sum_counts: core::array::from_fn(|i| specs[i].sample_count()),
        }
    }

    pub fn bin_sum_counts(&self) -> &[usize; N] {
        &self.bin_sum_counts
    }

    /// Walks `magnitudes` once, handing each band its configured number of samples.
    ///
    /// A zero-width band at bin 0 takes exactly bin 0. Samples past the last band are
    /// ignored; a buffer that runs out early leaves the remaining bands short.
    pub fn aggregate(&self, magnitudes: &[u16]) -> [u32; N] {
        let mut sums = [0u32; N];
        let mut samples = magnitudes.iter();
        for (sum, &count) in sums.iter_mut().zip(self.bin_sum_counts.iter()) {
            for &sample in samples.by_ref().take(count) {
                *sum = sum.saturating_add(sample as u32);
            }
        }
        sums
    }
}
