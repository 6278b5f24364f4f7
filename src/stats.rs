//! Latency percentile accumulator used by the `bench` binary.
//!
//! Grounded on `perf_stats.rs`'s `calculate_perf`/`print_stats` — trimmed
//! to the percentiles a load-generator actually reports, since this module
//! exists only to summarize `bench`'s output and isn't part of the wire
//! protocol or engine this crate is otherwise about.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Percentiles {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
}

/// Compute percentiles (nearest-rank) over `samples`, given in whatever
/// unit the caller measured (`bench` uses nanoseconds). Returns `None` for
/// an empty sample set.
pub fn percentiles(samples: &mut [u64]) -> Option<Percentiles> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    let len = samples.len();
    let at = |p: f64| -> u64 {
        let idx = (p / 100.0 * len as f64).ceil() as usize;
        samples[idx.saturating_sub(1).min(len - 1)]
    };
    Some(Percentiles {
        p50: at(50.0),
        p90: at(90.0),
        p99: at(99.0),
        p999: at(99.9),
        max: samples[len - 1],
    })
}

impl std::fmt::Display for Percentiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "p50={} p90={} p99={} p999={} max={}",
            self.p50, self.p90, self.p99, self.p999, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_of_empty_is_none() {
        assert!(percentiles(&mut []).is_none());
    }

    #[test]
    fn percentiles_of_uniform_run() {
        let mut samples: Vec<u64> = (1..=100).collect();
        let p = percentiles(&mut samples).unwrap();
        assert_eq!(p.p50, 50);
        assert_eq!(p.max, 100);
    }
}
