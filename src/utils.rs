use std::time::Duration;
use url::Url;

/// Pick one of the configured browser User-Agent strings at random.
pub fn random_user_agent(user_agents: &[String]) -> &str {
    if user_agents.is_empty() {
        return "Mozilla/5.0";
    }
    &user_agents[fastrand::usize(..user_agents.len())]
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else if seconds > 0 {
        format!("{}.{}s", seconds, millis / 100)
    } else {
        format!("{millis}ms")
    }
}

pub fn duration_to_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Lowercased extension of the URL path, e.g. `"m3u8"`; empty when there is none.
pub fn url_file_extension(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };

    let last_segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

pub fn is_m3u_url(url: &str) -> bool {
    matches!(url_file_extension(url).as_str(), "m3u" | "m3u8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(5)), "5.0s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
    }

    #[test]
    fn test_duration_to_ms() {
        assert_eq!(duration_to_ms(Duration::from_millis(1500)), 1500.0);
    }

    #[test]
    fn test_random_user_agent() {
        let agents = vec!["a".to_string(), "b".to_string()];
        for _ in 0..20 {
            let ua = random_user_agent(&agents);
            assert!(ua == "a" || ua == "b");
        }
        assert_eq!(random_user_agent(&[]), "Mozilla/5.0");
    }

    #[test]
    fn test_url_file_extension() {
        assert_eq!(url_file_extension("https://host/list.M3U8?x=1"), "m3u8");
        assert_eq!(url_file_extension("https://host/a/b/tv.txt"), "txt");
        assert_eq!(url_file_extension("https://host/dir/"), "");
        assert_eq!(url_file_extension("https://host/.hidden"), "");
        assert_eq!(url_file_extension("not a url"), "");
    }

    #[test]
    fn test_is_m3u_url() {
        assert!(is_m3u_url("http://h/playlist.m3u"));
        assert!(is_m3u_url("http://h/playlist.m3u8"));
        assert!(!is_m3u_url("http://h/playlist.txt"));
    }
}
