//! Post record lines.
//!
//! A post is stored and transmitted as a single tab-separated line of four
//! fields: `nick <TAB> feed-url <TAB> rfc3339-timestamp <TAB> message`.

use chrono::{DateTime, Utc};

/// Build the canonical four-field post line.
pub fn format_post(nick: &str, url: &str, timestamp: DateTime<Utc>, message: &str) -> String {
    format!("{}\t{}\t{}\t{}", nick, url, timestamp.to_rfc3339(), message)
}

/// The message field of a post line, if the line has all four fields.
pub fn message_of(line: &str) -> Option<&str> {
    line.splitn(4, '\t').nth(3)
}

/// Whether the post's message carries `tag` as a hashtag.
///
/// A token matches only if it starts with `#` and the remainder equals `tag`
/// exactly. Comparison is case-sensitive; `hello sqlite` does not match the
/// tag `sqlite`, `hello #sqlite` does.
pub fn has_tag(line: &str, tag: &str) -> bool {
    let Some(message) = message_of(line) else {
        return false;
    };
    message
        .split(' ')
        .any(|token| token.strip_prefix('#') == Some(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(message: &str) -> String {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        format_post("gbmor", "https://example.com/twtxt.txt", ts, message)
    }

    #[test]
    fn test_format_post_four_fields() {
        let l = line("hello world");
        assert_eq!(l.split('\t').count(), 4);
        assert!(l.starts_with("gbmor\thttps://example.com/twtxt.txt\t"));
        assert!(l.ends_with("\thello world"));
    }

    #[test]
    fn test_message_of() {
        assert_eq!(message_of(&line("hello world")), Some("hello world"));
        assert_eq!(message_of("nick\turl\tts"), None);
    }

    #[test]
    fn test_has_tag_requires_hash() {
        assert!(has_tag(&line("hello #sqlite world"), "sqlite"));
        assert!(!has_tag(&line("hello sqlite world"), "sqlite"));
    }

    #[test]
    fn test_has_tag_exact_and_case_sensitive() {
        assert!(!has_tag(&line("hello #sqlite3 world"), "sqlite"));
        assert!(!has_tag(&line("hello #SQLite world"), "sqlite"));
        assert!(has_tag(&line("#sqlite"), "sqlite"));
    }

    #[test]
    fn test_has_tag_malformed_line() {
        assert!(!has_tag("not a post", "sqlite"));
    }
}
