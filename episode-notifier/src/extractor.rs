//! Turns a raw feed-entry title such as `Example.Show.S02E05.1080p.WEB` into
//! an [`Episode`].

use crate::types::Episode;
use regex::Regex;
use std::sync::LazyLock;

static EPISODE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.+?)S(\d+)E(\d+)").expect("episode title pattern is valid")
});

/// Extracts show, season and episode from a release title.
///
/// Returns `None` when there is no `S<digits>E<digits>` marker after a
/// non-empty prefix, when the prefix normalizes to nothing, or when a number
/// does not fit in a `u32`.
pub fn extract_episode(raw_title: &str) -> Option<Episode> {
    let captures = EPISODE_TITLE.captures(raw_title)?;

    let title = normalize_show_name(captures.get(1)?.as_str());
    if title.is_empty() {
        return None;
    }

    let season = captures.get(2)?.as_str().parse::<u32>().ok()?;
    let episode = captures.get(3)?.as_str().parse::<u32>().ok()?;

    Some(Episode::new(&title, season, episode))
}

fn normalize_show_name(prefix: &str) -> String {
    let spaced = prefix.replace('.', " ").to_lowercase();
    let words = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    words
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .trim()
        .to_string()
}
