// ABOUTME: Integration tests for the utility functions exported by syndic-feed.
// ABOUTME: Tests date parsing, HTTP dates and charset normalization.

use syndic_feed::{format_http_date, normalize, parse_flexible_time, parse_http_date};

mod time_parse_tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_flexible_time("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_parse_rfc2822_with_timezone() {
        let dt = parse_flexible_time("Mon, 15 Jan 2024 10:30:00 +0500").unwrap();
        assert_eq!(dt.hour(), 5);
    }

    #[test]
    fn test_parse_naive_datetime_assumes_utc() {
        let dt = parse_flexible_time("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_flexible_time("2024-01-15").unwrap();
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_http_date_round_trip() {
        let text = format_http_date(1_700_000_000).unwrap();
        assert_eq!(text, "Tue, 14 Nov 2023 22:13:20 GMT");
        assert_eq!(parse_http_date(&text), Some(1_700_000_000));
    }

    #[test]
    fn test_http_date_rejects_nonsense() {
        assert_eq!(parse_http_date("never"), None);
    }
}

mod encoding_tests {
    use super::*;

    #[test]
    fn test_quoted_label_is_rejected() {
        // Header capture strips quotes; the normalizer sees the bare label.
        assert!(normalize(b"x", "\"ISO-8859-1\"").is_err());
        assert_eq!(normalize(b"x", "ISO-8859-1").unwrap(), "x");
    }

    #[test]
    fn test_windows_1252_specials() {
        let out = normalize(&[0x93, 0x68, 0x69, 0x94], "windows-1252").unwrap();
        assert_eq!(out, "\u{201c}hi\u{201d}");
    }

    #[test]
    fn test_koi8_r() {
        let out = normalize(&[0xf0, 0xd2, 0xc9, 0xd7, 0xc5, 0xd4], "koi8-r").unwrap();
        assert_eq!(out, "Привет");
    }

    #[test]
    fn test_shift_jis_invalid_sequence_fails() {
        let err = normalize(&[0x82], "shift_jis").unwrap_err();
        assert!(err.is_encoding());
    }
}
