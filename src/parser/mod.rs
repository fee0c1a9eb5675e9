//! Plain-text feed parsing.
//!
//! A feed document is one post per line: an RFC 3339 timestamp, a tab, and
//! the message. Lines starting with `#` are comments. Lines that don't
//! parse are skipped individually; a document yielding no posts at all is
//! an error.

use chrono::{DateTime, Utc};

use crate::app::{Result, RoostError};
use crate::domain::{format_post, StatusMap};

pub fn parse_feed(body: &[u8], nick: &str, url: &str) -> Result<StatusMap> {
    let text = std::str::from_utf8(body)
        .map_err(|e| RoostError::FeedParse(format!("{}: not valid UTF-8: {}", url, e)))?;

    let mut statuses = StatusMap::new();
    let mut skipped = 0usize;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((timestamp, message)) = line.split_once('\t') else {
            skipped += 1;
            tracing::debug!("{}: skipping line without tab separator", url);
            continue;
        };

        match parse_timestamp(timestamp.trim()) {
            Some(ts) => {
                statuses.insert(ts, format_post(nick, url, ts, message));
            }
            None => {
                skipped += 1;
                tracing::debug!("{}: skipping line with bad timestamp {:?}", url, timestamp);
            }
        }
    }

    if skipped > 0 {
        tracing::debug!("{}: skipped {} unparsable lines", url, skipped);
    }

    if statuses.is_empty() {
        return Err(RoostError::FeedParse(format!("{}: no parsable statuses", url)));
    }

    Ok(statuses)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| s.parse::<DateTime<Utc>>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# gbmor's feed
# nick = gbmor

2024-03-01T12:00:00Z\thello #sqlite world
2024-03-01T12:05:00+01:00\tsecond post
not a post line
2024-03-01T12:10:00Z\tthird post
";

    #[test]
    fn test_parse_skips_comments_blanks_and_bad_lines() {
        let statuses = parse_feed(SAMPLE.as_bytes(), "gbmor", "https://g.example/twtxt.txt").unwrap();
        assert_eq!(statuses.len(), 3);
    }

    #[test]
    fn test_parsed_records_have_four_fields() {
        let statuses = parse_feed(SAMPLE.as_bytes(), "gbmor", "https://g.example/twtxt.txt").unwrap();
        for line in statuses.values() {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 4);
            assert_eq!(fields[0], "gbmor");
            assert_eq!(fields[1], "https://g.example/twtxt.txt");
        }
    }

    #[test]
    fn test_offset_timestamps_normalized_to_utc() {
        let statuses = parse_feed(SAMPLE.as_bytes(), "gbmor", "https://g.example/twtxt.txt").unwrap();
        let keys: Vec<String> = statuses.keys().map(|ts| ts.to_rfc3339()).collect();
        // 12:05+01:00 is 11:05Z, so it sorts before the 12:00Z post.
        assert!(keys[0].starts_with("2024-03-01T11:05:00"));
    }

    #[test]
    fn test_empty_document_is_parse_error() {
        let err = parse_feed(b"# only comments\n", "gbmor", "u").unwrap_err();
        assert!(matches!(err, RoostError::FeedParse(_)));
    }

    #[test]
    fn test_non_utf8_is_parse_error() {
        let err = parse_feed(&[0xff, 0xfe, 0x00], "gbmor", "u").unwrap_err();
        assert!(matches!(err, RoostError::FeedParse(_)));
    }

    #[test]
    fn test_same_timestamp_last_write_wins() {
        let doc = "2024-03-01T12:00:00Z\tfirst\n2024-03-01T12:00:00Z\tsecond\n";
        let statuses = parse_feed(doc.as_bytes(), "gbmor", "u").unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses.values().next().unwrap().ends_with("second"));
    }
}
