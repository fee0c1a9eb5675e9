//! Search queries over the registry.
//!
//! All queries run under the shared read lock and return flat sequences of
//! tab-separated lines, ascending by timestamp unless noted otherwise.

use std::collections::HashSet;

use crate::app::Result;
use crate::domain::StatusMap;
use crate::registry::Registry;

impl Registry {
    /// Feeds whose nick contains `name` as a case-sensitive substring.
    ///
    /// Returns identity lines (`nick <TAB> url <TAB> first-seen`) ordered by
    /// each feed's first-seen timestamp, URL as tie-break so equal
    /// timestamps still produce a reproducible order.
    pub fn query_user(&self, name: &str) -> Result<Vec<String>> {
        // Only matching entries leave the lock, and only as identity lines;
        // status maps are never cloned here.
        let feeds = self.read_feeds()?;
        let mut matches: Vec<(chrono::DateTime<chrono::Utc>, &str, String)> = feeds
            .values()
            .filter(|entry| entry.nick.contains(name))
            .map(|entry| (entry.first_seen, entry.url.as_str(), entry.identity_line()))
            .collect();
        matches.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(matches.into_iter().map(|(_, _, line)| line).collect())
    }

    /// Posts from any feed carrying `tag` as a hashtag, ascending by
    /// timestamp. Exact, case-sensitive; the leading `#` is required.
    pub fn query_tag(&self, tag: &str) -> Result<Vec<String>> {
        let feeds = self.read_feeds()?;
        let mut merged = StatusMap::new();
        for entry in feeds.values() {
            merged.extend(entry.find_tag(tag));
        }
        Ok(merged.into_values().collect())
    }

    /// Posts whose full line contains `term` as a case-sensitive substring.
    pub fn query_in_status(&self, term: &str) -> Result<Vec<String>> {
        Ok(self
            .all_statuses()?
            .into_iter()
            .filter(|line| line.contains(term))
            .collect())
    }

    /// Approximate case-insensitive search by fanning `term` out across
    /// three literal casings: as given, first character upper-cased, and
    /// fully upper-cased. Results are concatenated and deduplicated,
    /// keeping first occurrences. Lines containing any `exclude` substring
    /// are dropped.
    ///
    /// Irregular internal capitalization ("SqLite") matches none of the
    /// three variants. Deliberate: true case-folding would change observable
    /// results and is not silently substituted.
    pub fn composite_query(&self, term: &str, exclude: &[&str]) -> Result<Vec<String>> {
        let mut combined = self.query_in_status(term)?;
        combined.extend(self.query_in_status(&first_upper(term))?);
        combined.extend(self.query_in_status(&term.to_uppercase())?);

        let mut out = dedupe(combined);
        if !exclude.is_empty() {
            out.retain(|line| !exclude.iter().any(|ex| line.contains(ex)));
        }
        Ok(out)
    }
}

/// Drop repeated elements, keeping each element's first occurrence in place.
pub fn dedupe(sequence: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    sequence
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Join two chronologically ordered result pages that may overlap at
/// exactly one boundary element, counting the boundary duplicate once.
///
/// When the pages come from overlapping time windows, the last element of
/// `first` equals the first element of `second`; that single duplicate is
/// collapsed. Anything else is plain concatenation: this is a seam merge,
/// not a full dedupe.
pub fn join_ordered_pages(first: Vec<String>, mut second: Vec<String>) -> Vec<String> {
    let mut joined = first;
    if joined.last().is_some() && joined.last() == second.first() {
        second.remove(0);
    }
    joined.extend(second);
    joined
}

fn first_upper(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::format_post;
    use chrono::{TimeZone, Utc};

    fn add_feed(registry: &Registry, nick: &str, url: &str, posts: &[(u32, &str)]) {
        let statuses: StatusMap = posts
            .iter()
            .map(|(minute, msg)| {
                let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, *minute, 0).unwrap();
                (ts, format_post(nick, url, ts, msg))
            })
            .collect();
        registry.add_or_update(nick, url, None, statuses).unwrap();
    }

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_user_substring_and_order() {
        let registry = Registry::new();
        add_feed(&registry, "alice", "https://a.example/twtxt.txt", &[]);
        add_feed(&registry, "balice", "https://b.example/twtxt.txt", &[]);
        add_feed(&registry, "carol", "https://c.example/twtxt.txt", &[]);

        let out = registry.query_user("alice").unwrap();
        assert_eq!(out.len(), 2);
        // alice registered first, so she sorts first.
        assert!(out[0].starts_with("alice\t"));
        assert!(out[1].starts_with("balice\t"));
    }

    #[test]
    fn test_query_user_case_sensitive() {
        let registry = Registry::new();
        add_feed(&registry, "Alice", "https://a.example/twtxt.txt", &[]);
        assert!(registry.query_user("alice").unwrap().is_empty());
        assert_eq!(registry.query_user("Alice").unwrap().len(), 1);
    }

    #[test]
    fn test_query_tag_requires_hash() {
        let registry = Registry::new();
        add_feed(
            &registry,
            "gbmor",
            "https://g.example/twtxt.txt",
            &[(0, "hello #sqlite world"), (1, "hello sqlite world")],
        );

        let out = registry.query_tag("sqlite").unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("#sqlite"));
    }

    #[test]
    fn test_query_tag_merges_feeds_in_time_order() {
        let registry = Registry::new();
        add_feed(&registry, "alice", "https://a.example/twtxt.txt", &[(3, "late #rust")]);
        add_feed(&registry, "bob", "https://b.example/twtxt.txt", &[(1, "early #rust")]);

        let out = registry.query_tag("rust").unwrap();
        assert_eq!(out.len(), 2);
        assert!(out[0].contains("early"));
        assert!(out[1].contains("late"));
    }

    #[test]
    fn test_query_in_status_substring() {
        let registry = Registry::new();
        add_feed(
            &registry,
            "alice",
            "https://a.example/twtxt.txt",
            &[(0, "shipping sqlite support"), (1, "gardening")],
        );

        let out = registry.query_in_status("sqlite").unwrap();
        assert_eq!(out.len(), 1);
        assert!(registry.query_in_status("SQLITE").unwrap().is_empty());
    }

    #[test]
    fn test_composite_query_three_casings_only() {
        let registry = Registry::new();
        add_feed(
            &registry,
            "alice",
            "https://a.example/twtxt.txt",
            &[
                (0, "plain sqlite here"),
                (1, "capitalized Sqlite here"),
                (2, "shouted SQLITE here"),
                (3, "mixed SqLite here"),
            ],
        );

        let out = registry.composite_query("sqlite", &[]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(!out.iter().any(|line| line.contains("SqLite")));
    }

    #[test]
    fn test_composite_query_matches_manual_fanout() {
        let registry = Registry::new();
        add_feed(
            &registry,
            "alice",
            "https://a.example/twtxt.txt",
            &[(0, "sqlite and Sqlite together"), (1, "SQLITE alone")],
        );

        let mut manual = registry.query_in_status("sqlite").unwrap();
        manual.extend(registry.query_in_status("Sqlite").unwrap());
        manual.extend(registry.query_in_status("SQLITE").unwrap());
        let manual = dedupe(manual);

        assert_eq!(registry.composite_query("sqlite", &[]).unwrap(), manual);
    }

    #[test]
    fn test_composite_query_exclude() {
        let registry = Registry::new();
        add_feed(
            &registry,
            "alice",
            "https://a.example/twtxt.txt",
            &[(0, "sqlite in rust"), (1, "sqlite in go")],
        );

        let out = registry.composite_query("sqlite", &["in go"]).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].contains("in rust"));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let out = dedupe(strs(&["first", "second", "third", "third", "second"]));
        assert_eq!(out, strs(&["first", "second", "third"]));
    }

    #[test]
    fn test_dedupe_empty_and_all_duplicates() {
        assert!(dedupe(Vec::new()).is_empty());
        assert_eq!(dedupe(strs(&["x", "x", "x"])), strs(&["x"]));
    }

    #[test]
    fn test_dedupe_idempotent() {
        let input = strs(&["a", "b", "a", "c", "b"]);
        let once = dedupe(input);
        let twice = dedupe(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_join_ordered_pages_collapses_boundary() {
        let out = join_ordered_pages(
            strs(&["one", "two", "three"]),
            strs(&["three", "four", "five", "six"]),
        );
        assert_eq!(out, strs(&["one", "two", "three", "four", "five", "six"]));
    }

    #[test]
    fn test_join_ordered_pages_no_overlap_is_concat() {
        let out = join_ordered_pages(strs(&["one", "two"]), strs(&["three", "four"]));
        assert_eq!(out, strs(&["one", "two", "three", "four"]));
    }

    #[test]
    fn test_join_ordered_pages_interior_duplicates_survive() {
        // Seam merge only: duplicates away from the boundary are kept.
        let out = join_ordered_pages(strs(&["one", "two"]), strs(&["three", "one"]));
        assert_eq!(out, strs(&["one", "two", "three", "one"]));
    }

    #[test]
    fn test_join_ordered_pages_empty_sides() {
        assert_eq!(join_ordered_pages(Vec::new(), strs(&["a"])), strs(&["a"]));
        assert_eq!(join_ordered_pages(strs(&["a"]), Vec::new()), strs(&["a"]));
        assert!(join_ordered_pages(Vec::new(), Vec::new()).is_empty());
    }
}
