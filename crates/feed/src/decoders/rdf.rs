// ABOUTME: Decoder for RSS 1.0 documents rooted at <rdf:RDF>.
// ABOUTME: Items are siblings of the channel; Dublin Core supplies authors and dates.

use super::{epoch, first_non_empty, text_of, Decoder};
use crate::error::FeedError;
use crate::models::{Feed, FeedItem};
use crate::namespaces::{CONTENT_URI, DC_URI, RDF_URI, RSS_0_90_URI, RSS_1_0_URI};
use crate::xml::Node;

#[derive(Debug, Default, Clone, Copy)]
pub struct RdfDecoder;

impl Decoder for RdfDecoder {
    fn decode(&self, feed: &mut Feed, root: Node<'_>) -> Result<(), FeedError> {
        // RSS 0.90 shares the RDF envelope under its own namespace.
        let ns = [RSS_1_0_URI, RSS_0_90_URI]
            .into_iter()
            .find(|ns| root.child("channel", Some(*ns)).is_some())
            .unwrap_or(RSS_1_0_URI);
        let ns = Some(ns);

        if let Some(channel) = root.child("channel", ns) {
            feed.title = text_of(channel, "title", ns);
            feed.link = text_of(channel, "link", ns);
            feed.description = text_of(channel, "description", ns);
            feed.pub_date = text_of(channel, "date", Some(DC_URI));
            feed.language = channel
                .child_text("language", Some(DC_URI))
                .filter(|s| !s.is_empty());
        }

        feed.items = root
            .elements()
            .filter(|n| n.has_name("item", ns))
            .map(|item| decode_item(item, ns))
            .collect();

        Ok(())
    }
}

fn decode_item(item: Node<'_>, ns: Option<&str>) -> FeedItem {
    let pub_date = text_of(item, "date", Some(DC_URI));
    let link = text_of(item, "link", ns);
    let guid = first_non_empty([
        item.attribute_ns(RDF_URI, "about").map(|s| s.trim().to_string()),
        Some(link.clone()),
    ]);

    let categories = item
        .elements()
        .filter(|n| n.has_name("subject", Some(DC_URI)))
        .map(|n| n.text().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    FeedItem {
        title: text_of(item, "title", ns),
        guid_is_permalink: !guid.is_empty() && guid == link,
        link,
        author: text_of(item, "creator", Some(DC_URI)),
        description: text_of(item, "description", ns),
        content: text_of(item, "encoded", Some(CONTENT_URI)),
        published: epoch(&pub_date),
        pub_date,
        guid,
        categories,
        base: item.xml_base(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;
    use pretty_assertions::assert_eq;

    const RDF: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.org/">
    <title>Planet</title>
    <link>https://example.org/</link>
    <description>Aggregated</description>
    <dc:date>2024-03-01T12:00:00+01:00</dc:date>
    <dc:language>de</dc:language>
  </channel>
  <item rdf:about="https://example.org/a">
    <title>A</title>
    <link>https://example.org/a</link>
    <dc:creator>Alice</dc:creator>
    <dc:date>2024-03-01T11:00:00Z</dc:date>
    <dc:subject>misc</dc:subject>
  </item>
  <item rdf:about="urn:b">
    <title>B</title>
    <link>https://example.org/b</link>
  </item>
</rdf:RDF>"#;

    fn decode(xml: &str) -> Feed {
        let doc = Document::parse(xml, "");
        let mut feed = Feed::default();
        RdfDecoder.decode(&mut feed, doc.root().unwrap()).unwrap();
        feed
    }

    #[test]
    fn decodes_channel_and_sibling_items() {
        let feed = decode(RDF);
        assert_eq!(feed.title, "Planet");
        assert_eq!(feed.link, "https://example.org/");
        assert_eq!(feed.description, "Aggregated");
        assert_eq!(feed.pub_date, "2024-03-01T12:00:00+01:00");
        assert_eq!(feed.language.as_deref(), Some("de"));
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn item_fields() {
        let feed = decode(RDF);
        let a = &feed.items[0];
        assert_eq!(a.title, "A");
        assert_eq!(a.author, "Alice");
        assert_eq!(a.guid, "https://example.org/a");
        assert!(a.guid_is_permalink);
        assert_eq!(a.published, Some(1709290800));
        assert_eq!(a.categories, vec!["misc"]);

        let b = &feed.items[1];
        assert_eq!(b.guid, "urn:b");
        assert!(!b.guid_is_permalink);
        assert_eq!(b.published, None);
    }

    #[test]
    fn rss_090_namespace() {
        let feed = decode(
            r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                        xmlns="http://my.netscape.com/rdf/simple/0.9/">
                 <channel><title>Old</title></channel>
                 <item><title>x</title><link>https://old.example/x</link></item>
               </rdf:RDF>"#,
        );
        assert_eq!(feed.title, "Old");
        assert_eq!(feed.items[0].guid, "https://old.example/x");
    }
}
