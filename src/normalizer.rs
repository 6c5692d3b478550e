//! Turns raw playlist lines into a canonical, deduplicated candidate list.
//!
//! The stages always run in the order split, clean, dedup: cleaning changes
//! the URL used as dedup key and splitting can produce new duplicates.

use std::collections::HashSet;
use tracing::info;

/// Marker used by text playlists for section header lines.
pub const GENRE_MARKER: &str = "#genre#";

/// Separator every stream URL must contain.
pub const SCHEME_SEPARATOR: &str = "://";

/// A name and URL proposed for probing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub name: String,
    pub url: String,
}

impl Candidate {
    /// Returns `None` unless `url` is non-empty and carries a scheme separator.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Option<Self> {
        let name = name.into().trim().to_string();
        let url = url.into().trim().to_string();
        if url.is_empty() || !url.contains(SCHEME_SEPARATOR) {
            return None;
        }
        Some(Self { name, url })
    }

    /// Render back into the `name,url` line format.
    pub fn to_line(&self) -> String {
        format!("{},{}", self.name, self.url)
    }
}

/// Counts observed after each stage, for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub input: usize,
    pub after_split: usize,
    pub after_clean: usize,
    pub after_dedup: usize,
}

/// Whether a raw line looks like a `name,url` playlist entry.
pub fn is_playlist_entry(line: &str) -> bool {
    !line.contains(GENRE_MARKER) && line.contains(',') && line.contains(SCHEME_SEPARATOR)
}

/// Explode `name,url1#url2` lines into one candidate per alternate URL.
///
/// Lines that are not playlist entries are discarded here. Alternates
/// without a scheme separator are dropped; order is preserved.
pub fn split_alternates<S: AsRef<str>>(lines: &[S]) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if !is_playlist_entry(line) {
            continue;
        }

        let Some((name, address)) = line.split_once(',') else {
            continue;
        };

        if address.contains('#') {
            candidates.extend(
                address
                    .split('#')
                    .filter(|url| url.contains(SCHEME_SEPARATOR))
                    .filter_map(|url| Candidate::new(name, url)),
            );
        } else if let Some(candidate) = Candidate::new(name, address) {
            candidates.push(candidate);
        }
    }

    candidates
}

/// Strip trailing `$annotation` suffixes from a URL.
///
/// Truncation at the last `$` is repeated until none remains, so the
/// result is stable when cleaned again.
pub fn strip_annotation(url: &str) -> &str {
    let mut url = url;
    while let Some(idx) = url.rfind('$') {
        url = &url[..idx];
    }
    url.trim_end()
}

pub fn clean_annotations(candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter_map(|c| {
            let cleaned = strip_annotation(&c.url).to_string();
            Candidate::new(c.name, cleaned)
        })
        .collect()
}

/// Keep the first occurrence of each URL (exact, case-sensitive match).
pub fn dedup_by_url(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}

/// Run the full split, clean, dedup pipeline.
pub fn normalize<S: AsRef<str>>(lines: &[S]) -> Vec<Candidate> {
    normalize_with_stats(lines).0
}

pub fn normalize_with_stats<S: AsRef<str>>(lines: &[S]) -> (Vec<Candidate>, NormalizeStats) {
    let mut stats = NormalizeStats {
        input: lines.len(),
        ..Default::default()
    };

    let split = split_alternates(lines);
    stats.after_split = split.len();

    let cleaned = clean_annotations(split);
    stats.after_clean = cleaned.len();

    let unique = dedup_by_url(cleaned);
    stats.after_dedup = unique.len();

    info!(
        "Normalized {} lines: {} after split, {} after clean, {} after dedup",
        stats.input, stats.after_split, stats.after_clean, stats.after_dedup
    );

    (unique, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.url.as_str()).collect()
    }

    #[test]
    fn test_first_occurrence_wins_across_names() {
        let lines = ["A,http://x/1#http://x/2", "B,http://x/1$720p"];
        let out = normalize(&lines);

        assert_eq!(
            out,
            vec![
                Candidate::new("A", "http://x/1").unwrap(),
                Candidate::new("A", "http://x/2").unwrap(),
            ]
        );
    }

    #[test]
    fn test_filters_headers_and_schemeless_lines() {
        let lines = [
            "央视频道,#genre#",
            "#EXTM3U",
            "no separator http://x/1",
            "News,not-a-url",
            "News, http://x/ok ",
        ];
        let out = normalize(&lines);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "News");
        assert_eq!(out[0].url, "http://x/ok");
    }

    #[test]
    fn test_split_preserves_order_and_drops_bad_alternates() {
        let lines = ["Movie,rtmp://a/1#garbage#http://b/2#  rtsp://c/3 "];
        let out = split_alternates(&lines);
        assert_eq!(urls(&out), vec!["rtmp://a/1", "http://b/2", "rtsp://c/3"]);
        assert!(out.iter().all(|c| c.name == "Movie"));
    }

    #[test]
    fn test_comma_only_line_passes_through() {
        let lines = ["Sports,http://x/live.m3u8?a=1,b=2"];
        let out = split_alternates(&lines);
        assert_eq!(urls(&out), vec!["http://x/live.m3u8?a=1,b=2"]);
    }

    #[test]
    fn test_strip_annotation() {
        assert_eq!(strip_annotation("http://x/1$720p"), "http://x/1");
        assert_eq!(strip_annotation("http://x/1$a$b"), "http://x/1");
        assert_eq!(strip_annotation("http://x/1"), "http://x/1");
    }

    #[test]
    fn test_clean_drops_urls_left_without_scheme() {
        let out = clean_annotations(vec![Candidate {
            name: "Odd".to_string(),
            url: "http$://x".to_string(),
        }]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_empty_name_is_preserved() {
        let out = normalize(&[",http://x/1"]);
        assert_eq!(out[0].name, "");
    }

    #[test]
    fn test_output_invariants() {
        let lines = [
            "A,http://x/1#http://x/2$hd#rtp://239.0.0.1:5000",
            "B,http://x/2",
            "C,p3p://peer:9000/ch$src",
            "D,http://x/3$a$b",
            "E,#genre#",
        ];
        let out = normalize(&lines);

        let mut seen = HashSet::new();
        for c in &out {
            assert_eq!(c.url.matches(SCHEME_SEPARATOR).count(), 1);
            assert!(!c.url.contains('#'));
            assert!(!c.url.contains('$'));
            assert!(seen.insert(c.url.clone()), "duplicate url {}", c.url);
        }
    }

    #[test]
    fn test_idempotent() {
        let lines = [
            "A,http://x/1#http://x/2$hd",
            "B,http://x/1",
            "C, rtsp://cam/1$a$b ",
            "D,http://x/q?a=1,b=2",
        ];
        let once = normalize(&lines);
        let rendered: Vec<String> = once.iter().map(Candidate::to_line).collect();
        let twice = normalize(&rendered);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_stats() {
        let lines = ["A,http://x/1#http://x/2", "B,http://x/1$720p", "junk"];
        let (_, stats) = normalize_with_stats(&lines);
        assert_eq!(
            stats,
            NormalizeStats {
                input: 3,
                after_split: 3,
                after_clean: 3,
                after_dedup: 2,
            }
        );
    }
}
