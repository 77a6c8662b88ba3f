use iris_core::stats::histogram::Histogram;

#[test]
fn total_matches_bin_sum() {
    let bins = [1u32, 5, 0, 3, 7, 0, 2];
    let hist = Histogram::new(&bins);
    assert_eq!(hist.total(), bins.iter().map(|&b| b as u64).sum::<u64>());
    assert_eq!(hist.bins(), bins.len());
}

#[test]
fn quantiles_are_monotonic() {
    let mut bins = [0u32; 256];
    for (i, bin) in bins.iter_mut().enumerate() {
        *bin = ((i * 7) % 13) as u32;
    }
    let hist = Histogram::new(&bins);

    let mut previous = 0.0;
    for step in 0..=100 {
        let q = step as f64 / 100.0;
        let bin = hist.quantile(q);
        assert!(
            bin >= previous,
            "quantile({q}) = {bin} went below {previous}"
        );
        previous = bin;
    }
}

#[test]
fn quantile_of_single_spike() {
    let mut bins = [0u32; 256];
    bins[20] = 1000;
    let hist = Histogram::new(&bins);
    assert_eq!(hist.quantile(0.5).floor(), 20.0);
    assert!((hist.inter_quantile_mean(0.0, 1.0) - 20.5).abs() < 1e-9);
}

#[test]
fn cumulative_freq_interpolates() {
    let bins = [10u32, 10, 10, 10];
    let hist = Histogram::new(&bins);
    assert_eq!(hist.cumulative_freq(0.0), 0.0);
    assert_eq!(hist.cumulative_freq(2.0), 20.0);
    assert!((hist.cumulative_freq(2.5) - 25.0).abs() < 1e-9);
    assert_eq!(hist.cumulative_freq(100.0), 40.0);
}

#[test]
fn quantile_round_trips_through_cumulative_freq() {
    let mut bins = [0u32; 256];
    bins[3] = 17;
    bins[42] = 4;
    bins[77] = 250;
    bins[254] = 1;
    let hist = Histogram::new(&bins);

    for bin in [3usize, 42, 77, 254] {
        let q = hist.cumulative_freq(bin as f64) / hist.total() as f64;
        assert_eq!(
            hist.quantile(q),
            bin as f64,
            "round trip through bin {bin} failed"
        );
    }
}

#[test]
fn empty_histogram_reads_fully_bright() {
    let hist = Histogram::new(&[0u32; 256]);
    assert_eq!(hist.inter_quantile_mean(0.0, 1.0), 255.5);
}

#[test]
fn inter_quantile_mean_of_top_slice() {
    let mut bins = [0u32; 256];
    bins[100] = 98;
    bins[200] = 2;
    let hist = Histogram::new(&bins);

    // The top 2% of the mass sits entirely in bin 200.
    let mean = hist.inter_quantile_mean(0.98, 1.0);
    assert!((mean - 200.5).abs() < 1e-6, "got {mean}");
}
