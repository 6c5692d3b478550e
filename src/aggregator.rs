//! Classification, ordering and capping of probe results.

use crate::{Config, ProbeResult};
use std::collections::HashMap;

/// Retention knobs applied after probing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationPolicy {
    pub save_failed: bool,
    pub keep_per_name: Option<usize>,
    pub max_results: Option<usize>,
}

impl AggregationPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            save_failed: config.save_failed,
            keep_per_name: config.keep_per_name,
            max_results: config.max_results,
        }
    }
}

/// Final ordered lists handed to the report writer.
#[derive(Debug, Clone, Default)]
pub struct Aggregated {
    /// Successes by ascending latency, then retained failures, after both caps.
    pub kept: Vec<ProbeResult>,
    /// Every unreachable result, ordered by `name,url`.
    pub failed: Vec<ProbeResult>,
}

impl Aggregated {
    pub fn reachable(&self) -> impl Iterator<Item = &ProbeResult> {
        self.kept.iter().filter(|r| r.reachable)
    }
}

/// Split into successes and failures, each sorted into its output order.
pub fn partition_sorted(results: Vec<ProbeResult>) -> (Vec<ProbeResult>, Vec<ProbeResult>) {
    let (mut successes, mut failures): (Vec<_>, Vec<_>) =
        results.into_iter().partition(|r| r.reachable);

    // `sort_by` is stable; results without a latency sort last.
    successes.sort_by(|a, b| {
        let a = a.elapsed_ms.unwrap_or(f64::INFINITY);
        let b = b.elapsed_ms.unwrap_or(f64::INFINITY);
        a.total_cmp(&b)
    });
    failures.sort_by_cached_key(ProbeResult::name_url);

    (successes, failures)
}

/// Keep at most `limit` entries per name, first seen wins.
pub fn apply_per_name_cap(results: Vec<ProbeResult>, limit: usize) -> Vec<ProbeResult> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    results
        .into_iter()
        .filter(|r| {
            let count = seen.entry(r.name.clone()).or_insert(0);
            *count += 1;
            *count <= limit
        })
        .collect()
}

pub fn apply_global_cap(mut results: Vec<ProbeResult>, limit: usize) -> Vec<ProbeResult> {
    results.truncate(limit);
    results
}

pub fn aggregate(results: Vec<ProbeResult>, policy: &AggregationPolicy) -> Aggregated {
    let (successes, failures) = partition_sorted(results);

    let mut kept = successes;
    if policy.save_failed {
        kept.extend(failures.iter().cloned());
    }
    if let Some(limit) = policy.keep_per_name {
        kept = apply_per_name_cap(kept, limit);
    }
    if let Some(limit) = policy.max_results {
        kept = apply_global_cap(kept, limit);
    }

    Aggregated {
        kept,
        failed: failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Protocol;

    fn result(name: &str, url: &str, reachable: bool, elapsed_ms: Option<f64>) -> ProbeResult {
        ProbeResult {
            name: name.to_string(),
            url: url.to_string(),
            protocol: Protocol::from_url(url),
            reachable,
            elapsed_ms,
            resolution: None,
            error: None,
        }
    }

    fn names(results: &[ProbeResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_successes_sorted_by_latency() {
        let aggregated = aggregate(
            vec![
                result("slow", "http://a/1", true, Some(300.0)),
                result("fast", "http://a/2", true, Some(12.5)),
                result("mid", "http://a/3", true, Some(80.0)),
            ],
            &AggregationPolicy::default(),
        );

        assert_eq!(names(&aggregated.kept), ["fast", "mid", "slow"]);
        let latencies: Vec<f64> = aggregated.kept.iter().filter_map(|r| r.elapsed_ms).collect();
        assert!(latencies.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_equal_latency_keeps_input_order() {
        let aggregated = aggregate(
            vec![
                result("second", "http://b/1", true, Some(50.0)),
                result("first", "http://a/1", true, Some(50.0)),
            ],
            &AggregationPolicy::default(),
        );
        assert_eq!(names(&aggregated.kept), ["second", "first"]);
    }

    #[test]
    fn test_failures_dropped_unless_saved() {
        let results = vec![
            result("ok", "http://a/1", true, Some(10.0)),
            result("z", "http://z/1", false, Some(5.0)),
            result("b", "http://b/1", false, None),
        ];

        let dropped = aggregate(results.clone(), &AggregationPolicy::default());
        assert_eq!(names(&dropped.kept), ["ok"]);
        assert_eq!(names(&dropped.failed), ["b", "z"]);

        let saved = aggregate(
            results,
            &AggregationPolicy {
                save_failed: true,
                ..Default::default()
            },
        );
        assert_eq!(names(&saved.kept), ["ok", "b", "z"]);
        assert_eq!(saved.reachable().count(), 1);
    }

    #[test]
    fn test_failures_sorted_by_name_url() {
        let (_, failures) = partition_sorted(vec![
            result("A", "http://x/2", false, None),
            result("A", "http://x/1", false, Some(3.0)),
            result("0", "rtp://h:1", false, None),
        ]);
        let keys: Vec<String> = failures.iter().map(ProbeResult::name_url).collect();
        assert_eq!(keys, ["0,rtp://h:1", "A,http://x/1", "A,http://x/2"]);
    }

    #[test]
    fn test_per_name_cap_keeps_fastest() {
        let aggregated = aggregate(
            vec![
                result("CCTV1", "http://a/1", true, Some(90.0)),
                result("CCTV1", "http://a/2", true, Some(10.0)),
                result("CCTV1", "http://a/3", true, Some(40.0)),
                result("CCTV2", "http://b/1", true, Some(20.0)),
            ],
            &AggregationPolicy {
                keep_per_name: Some(2),
                ..Default::default()
            },
        );

        let urls: Vec<&str> = aggregated.kept.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["http://a/2", "http://b/1", "http://a/3"]);
    }

    #[test]
    fn test_per_name_cap_bound_holds() {
        let results: Vec<ProbeResult> = (0..30)
            .map(|i| {
                result(
                    &format!("ch{}", i % 4),
                    &format!("http://h/{i}"),
                    true,
                    Some((i * 7 % 11) as f64),
                )
            })
            .collect();

        for limit in 1..=5 {
            let capped = apply_per_name_cap(results.clone(), limit);
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for r in &capped {
                *counts.entry(r.name.as_str()).or_default() += 1;
            }
            assert!(counts.values().all(|&n| n <= limit));
        }
    }

    #[test]
    fn test_global_cap_is_min_of_len_and_max() {
        let results: Vec<ProbeResult> = (0..7)
            .map(|i| result("ch", &format!("http://h/{i}"), true, Some(i as f64)))
            .collect();

        for max in [0, 1, 3, 7, 20] {
            let capped = apply_global_cap(results.clone(), max);
            assert_eq!(capped.len(), max.min(results.len()));
        }
    }

    #[test]
    fn test_caps_apply_after_failures_appended() {
        let aggregated = aggregate(
            vec![
                result("a", "http://a/1", true, Some(1.0)),
                result("b", "http://b/1", false, None),
                result("c", "http://c/1", false, None),
            ],
            &AggregationPolicy {
                save_failed: true,
                keep_per_name: None,
                max_results: Some(2),
            },
        );
        assert_eq!(names(&aggregated.kept), ["a", "b"]);
        assert_eq!(aggregated.failed.len(), 2);
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config {
            save_failed: true,
            keep_per_name: Some(3),
            ..Default::default()
        };
        let policy = AggregationPolicy::from_config(&config);
        assert!(policy.save_failed);
        assert_eq!(policy.keep_per_name, Some(3));
        assert_eq!(policy.max_results, None);
    }
}
