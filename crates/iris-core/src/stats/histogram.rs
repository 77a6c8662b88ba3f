/// Cumulative luma histogram.
///
/// Wraps the per-bin counts with a cumulative array of length `bins + 1`
/// (`cum[0] = 0`, `cum[bins] = total`) so quantile queries are a binary
/// search. Bin positions are fractional: a quantile landing partway
/// through a bin interpolates within it.
#[derive(Clone, Debug)]
pub struct Histogram {
    cumulative: Vec<u64>,
}

impl Histogram {
    pub fn new(data: &[u32]) -> Self {
        let mut cumulative = Vec::with_capacity(data.len() + 1);
        cumulative.push(0);
        let mut sum = 0u64;
        for &count in data {
            sum += count as u64;
            cumulative.push(sum);
        }
        Self { cumulative }
    }

    /// Number of bins.
    pub fn bins(&self) -> usize {
        self.cumulative.len() - 1
    }

    /// Total count over all bins.
    pub fn total(&self) -> u64 {
        *self.cumulative.last().unwrap_or(&0)
    }

    /// Cumulative frequency up to a fractional bin position, interpolating
    /// linearly inside the bin.
    pub fn cumulative_freq(&self, bin: f64) -> f64 {
        if bin <= 0.0 {
            return 0.0;
        } else if bin >= self.bins() as f64 {
            return self.total() as f64;
        }
        let b = bin as usize;
        self.cumulative[b] as f64
            + (bin - b as f64) * (self.cumulative[b + 1] - self.cumulative[b]) as f64
    }

    /// Fractional bin position below which a fraction `q` of the counts
    /// lie, `0 <= q <= 1`.
    pub fn quantile(&self, q: f64) -> f64 {
        self.quantile_range(q, 0, self.bins() - 1)
    }

    fn quantile_range(&self, q: f64, first: usize, last: usize) -> f64 {
        debug_assert!(first <= last);
        if self.total() == 0 {
            return first as f64;
        }

        // Round, so a bin boundary hit from just below by floating error
        // still lands on the boundary.
        let items = (q * self.total() as f64).round() as u64;

        let (mut first, mut last) = (first, last);
        while first < last {
            let middle = (first + last) / 2;
            if self.cumulative[middle + 1] > items {
                last = middle;
            } else {
                first = middle + 1;
            }
        }

        let span = self.cumulative[first + 1] - self.cumulative[first];
        let frac = if span == 0 {
            0.0
        } else {
            (items - self.cumulative[first]) as f64 / span as f64
        };
        first as f64 + frac
    }

    /// Mean bin value between two quantiles, weighted by count and offset
    /// by 0.5 so the value reads at bin mid-points.
    ///
    /// An empty histogram reads as fully bright: the AE loop must pull
    /// exposure down, never up, when it is blind.
    pub fn inter_quantile_mean(&self, low_quantile: f64, high_quantile: f64) -> f64 {
        debug_assert!(high_quantile > low_quantile);
        if self.total() == 0 {
            return self.bins() as f64 - 0.5;
        }

        let mut low_point = self.quantile(low_quantile);
        let high_point = self.quantile_range(high_quantile, low_point as usize, self.bins() - 1);

        let mut sum_bin_freq = 0.0;
        let mut cumul_freq = 0.0;
        let mut p_next = low_point.floor() + 1.0;
        while p_next <= high_point.ceil() {
            let bin = low_point.floor() as usize;
            let span = (self.cumulative[bin + 1] - self.cumulative[bin]) as f64;
            let freq = span * (p_next.min(high_point) - low_point);
            sum_bin_freq += bin as f64 * freq;
            cumul_freq += freq;
            low_point = p_next;
            p_next += 1.0;
        }

        sum_bin_freq / cumul_freq + 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cumulative_is_monotonic() {
        let hist = Histogram::new(&[4, 0, 3, 1]);
        assert_eq!(hist.total(), 8);
        for b in 1..=hist.bins() {
            assert!(hist.cumulative_freq(b as f64) >= hist.cumulative_freq(b as f64 - 1.0));
        }
    }

    #[test]
    fn empty_histogram_reads_bright() {
        let hist = Histogram::new(&[0u32; 256]);
        assert_eq!(hist.inter_quantile_mean(0.0, 1.0), 255.5);
    }
}
