// ABOUTME: Integration tests for the buffer and file entry points.
// ABOUTME: Covers format classification end to end, malformed input recovery and file parsing.

use std::io::Write;

use pretty_assertions::assert_eq;
use syndic_feed::{parse_feed_bytes, FeedParser, FormatVariant};

/// A minimal Atom 1.0 document parses to an Atom 1.0 feed with no items.
#[test]
fn test_minimal_atom10() {
    let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>t</title></feed>"#;
    let feed = parse_feed_bytes(atom.as_bytes(), "mem").unwrap();
    assert_eq!(feed.format, FormatVariant::Atom10);
    assert_eq!(feed.title, "t");
    assert!(feed.items.is_empty(), "no entries should decode to no items");
}

/// Every rss version label maps to its variant, 1.0 included.
#[test]
fn test_rss_version_labels() {
    for (version, expected) in [
        ("0.91", FormatVariant::Rss091),
        ("0.92", FormatVariant::Rss092),
        ("0.94", FormatVariant::Rss094),
        ("2.0", FormatVariant::Rss20),
        ("2", FormatVariant::Rss20),
        ("1.0", FormatVariant::Rss091),
    ] {
        let xml = format!(
            r#"<rss version="{}"><channel><title>x</title><item><title>i</title></item></channel></rss>"#,
            version
        );
        let feed = parse_feed_bytes(xml.as_bytes(), "mem").unwrap();
        assert_eq!(feed.format, expected, "version {}", version);
        assert_eq!(feed.items.len(), 1);
    }
}

/// An RDF root is RSS 1.0 whatever its attributes say.
#[test]
fn test_rdf_is_rss10() {
    let rdf = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                          xmlns="http://purl.org/rss/1.0/" version="0.91">
        <channel><title>R</title></channel>
        <item><title>one</title><link>https://r.example/1</link></item>
    </rdf:RDF>"#;
    let feed = parse_feed_bytes(rdf.as_bytes(), "mem").unwrap();
    assert_eq!(feed.format, FormatVariant::Rss10);
    assert_eq!(feed.items[0].link, "https://r.example/1");
}

/// Detection failures carry the documented messages.
#[test]
fn test_detection_errors() {
    let cases = [
        ("<rss><channel/></rss>", "no RSS version"),
        (r#"<rss version="3.0"/>"#, "invalid RSS version"),
        ("<feed/>", "no Atom version"),
        (r#"<feed xmlns="urn:other" version="1.0"/>"#, "invalid Atom version"),
    ];
    for (xml, message) in cases {
        let err = parse_feed_bytes(xml.as_bytes(), "mem").unwrap_err();
        assert!(err.is_format_detection(), "{} should fail detection", xml);
        assert_eq!(err.to_string(), message);
    }
}

/// Input without a root element is malformed, not a detection failure.
#[test]
fn test_no_root_element() {
    for input in ["", "   ", "<?xml version=\"1.0\"?>", "just text"] {
        let err = parse_feed_bytes(input.as_bytes(), "mem").unwrap_err();
        assert!(err.is_malformed(), "{:?} should be malformed", input);
        assert_eq!(err.to_string(), "could not parse buffer");
    }
}

/// Unclosed tags and bare ampersands are recovered rather than rejected.
#[test]
fn test_recovers_sloppy_markup() {
    let rss = r#"<rss version="2.0"><channel>
        <title>Fish & Chips</title>
        <item><title>Cod</title></item>
        <item><title>Haddock"#;
    let feed = parse_feed_bytes(rss.as_bytes(), "mem").unwrap();
    assert_eq!(feed.title, "Fish & Chips");
    assert_eq!(feed.items.len(), 2);
    assert_eq!(feed.items[1].title, "Haddock");
}

/// A UTF-8 BOM is skipped and the feed reports the canonical encoding.
#[test]
fn test_utf8_bom() {
    let mut data = vec![0xef, 0xbb, 0xbf];
    data.extend_from_slice("<rss version=\"2.0\"><channel><title>Zoë</title></channel></rss>".as_bytes());
    let feed = parse_feed_bytes(&data, "mem").unwrap();
    assert_eq!(feed.title, "Zoë");
    assert_eq!(feed.encoding, "utf-8");
}

/// Files are parsed the same way as buffers.
#[test]
fn test_parse_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://purl.org/atom/ns#" version="0.3">
  <title>Disk</title>
  <entry><title>e</title><id>1</id></entry>
</feed>"#,
    )
    .unwrap();

    let feed = FeedParser::new().parse_file(file.path()).unwrap();
    assert_eq!(feed.format, FormatVariant::Atom03);
    assert_eq!(feed.encoding, "utf-8");
    assert_eq!(feed.items.len(), 1);
}

/// A missing file and an empty file both fail as malformed documents.
#[test]
fn test_parse_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.xml");
    let err = FeedParser::new().parse_file(&missing).unwrap_err();
    assert!(err.is_malformed());
    assert!(err.to_string().starts_with("could not parse file"));

    let empty = dir.path().join("empty.xml");
    std::fs::write(&empty, b"").unwrap();
    let err = FeedParser::new().parse_file(&empty).unwrap_err();
    assert_eq!(err.to_string(), "could not parse file");
}

/// One parser can be shared by several threads.
#[test]
fn test_parser_is_shareable() {
    let parser = FeedParser::new();
    std::thread::scope(|s| {
        for i in 0..4 {
            let parser = &parser;
            s.spawn(move || {
                let xml = format!(r#"<rss version="2.0"><channel><title>{}</title></channel></rss>"#, i);
                let feed = parser.parse_str(&xml, "mem").unwrap();
                assert_eq!(feed.title, i.to_string());
            });
        }
    });
}
