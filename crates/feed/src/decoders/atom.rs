// ABOUTME: Decoder for Atom 1.0 and Atom 0.3 feeds, with or without the 0.3 namespace.
// ABOUTME: Matches elements in whatever namespace the root element uses.

use url::Url;

use super::{epoch, first_non_empty, Decoder};
use crate::error::FeedError;
use crate::models::{Enclosure, Feed, FeedItem};
use crate::namespaces::{DC_URI, XHTML_URI, XML_URI};
use crate::xml::Node;

#[derive(Debug, Default, Clone, Copy)]
pub struct AtomDecoder;

impl Decoder for AtomDecoder {
    fn decode(&self, feed: &mut Feed, root: Node<'_>) -> Result<(), FeedError> {
        let ns = root.namespace();

        if let Some(title) = root.child("title", ns) {
            let (text, kind) = text_construct(title);
            feed.title = text.trim().to_string();
            feed.title_type = kind;
        }
        feed.link = alternate_link(root, ns).unwrap_or_default();
        feed.description = first_non_empty([
            root.child_text("subtitle", ns),
            root.child_text("tagline", ns),
        ]);
        feed.pub_date = first_non_empty([
            root.child_text("updated", ns),
            root.child_text("modified", ns),
        ]);
        feed.language = root
            .attribute_ns(XML_URI, "lang")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let feed_author = root.child("author", ns).map(|a| person(a, ns));
        feed.managing_editor = feed_author
            .as_ref()
            .map(|(name, _)| name.clone())
            .filter(|n| !n.is_empty());

        feed.items = root
            .elements()
            .filter(|n| n.has_name("entry", ns))
            .map(|entry| decode_entry(entry, ns, feed_author.as_ref()))
            .collect();

        Ok(())
    }
}

fn decode_entry(
    entry: Node<'_>,
    ns: Option<&str>,
    feed_author: Option<&(String, Option<String>)>,
) -> FeedItem {
    let base = entry.xml_base();

    let (title, title_type) = entry
        .child("title", ns)
        .map(text_construct)
        .map(|(text, kind)| (text.trim().to_string(), kind))
        .unwrap_or_default();

    let (author, author_email) = entry
        .child("author", ns)
        .map(|a| person(a, ns))
        .or_else(|| feed_author.cloned())
        .unwrap_or_default();

    let pub_date = first_non_empty([
        entry.child_text("published", ns),
        entry.child_text("issued", ns),
        entry.child_text("created", ns),
    ]);
    let updated = first_non_empty([
        entry.child_text("updated", ns),
        entry.child_text("modified", ns),
    ]);

    let enclosures = entry
        .elements()
        .filter(|n| n.has_name("link", ns) && n.attribute("rel") == Some("enclosure"))
        .filter_map(|n| {
            let href = n.attribute("href")?.trim();
            if href.is_empty() {
                return None;
            }
            Some(Enclosure {
                url: resolve(base.as_deref(), href),
                mime_type: n.attribute("type").map(|t| t.trim().to_string()),
                length: n
                    .attribute("length")
                    .and_then(|l| l.trim().parse().ok())
                    .unwrap_or(0),
            })
        })
        .collect();

    let categories = entry
        .elements()
        .filter_map(|n| {
            if n.has_name("category", ns) {
                n.attribute("term")
                    .map(str::to_string)
                    .or_else(|| Some(n.text()))
            } else if n.has_name("subject", Some(DC_URI)) {
                Some(n.text())
            } else {
                None
            }
        })
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let link = alternate_link(entry, ns)
        .map(|href| resolve(base.as_deref(), &href))
        .unwrap_or_default();

    FeedItem {
        title,
        title_type,
        link,
        author,
        author_email,
        description: entry
            .child("summary", ns)
            .map(|s| text_construct(s).0.trim().to_string())
            .unwrap_or_default(),
        content: entry
            .child("content", ns)
            .map(|c| text_construct(c).0.trim().to_string())
            .unwrap_or_default(),
        published: epoch(&pub_date).or_else(|| epoch(&updated)),
        updated: epoch(&updated),
        pub_date: if pub_date.is_empty() { updated } else { pub_date },
        guid: entry.child_text("id", ns).unwrap_or_default(),
        guid_is_permalink: false,
        enclosures,
        categories,
        base,
    }
}

/// Text of an Atom text construct plus its declared type.
///
/// XHTML content is serialized back to markup with the wrapping `div` removed.
/// Atom 0.3's `mode="xml"` is treated the same way.
fn text_construct(node: Node<'_>) -> (String, Option<String>) {
    let kind = node.attribute("type").map(|t| t.trim().to_string());
    let inline_xml = matches!(
        kind.as_deref(),
        Some("xhtml") | Some("application/xhtml+xml")
    ) || node.attribute("mode") == Some("xml");

    if !inline_xml {
        return (node.text(), kind);
    }

    let wrapper = node
        .elements()
        .find(|n| n.has_name("div", Some(XHTML_URI)));
    let markup = match wrapper {
        Some(div) if node.elements().count() == 1 => div.inner_xml(),
        _ => node.inner_xml(),
    };
    (markup, kind)
}

/// Name and email of an Atom person construct.
fn person(node: Node<'_>, ns: Option<&str>) -> (String, Option<String>) {
    let name = node.child_text("name", ns).unwrap_or_default();
    let email = node.child_text("email", ns).filter(|e| !e.is_empty());
    (name, email)
}

/// `href` of the alternate link, preferring an HTML one.
fn alternate_link(node: Node<'_>, ns: Option<&str>) -> Option<String> {
    let alternates: Vec<Node<'_>> = node
        .elements()
        .filter(|n| n.has_name("link", ns))
        .filter(|n| matches!(n.attribute("rel").map(str::trim), None | Some("alternate")))
        .collect();

    alternates
        .iter()
        .find(|n| n.attribute("type").map(str::trim) == Some("text/html"))
        .or_else(|| alternates.first())
        .and_then(|n| n.attribute("href"))
        .map(|href| href.trim().to_string())
}

fn resolve(base: Option<&str>, href: &str) -> String {
    base.and_then(|b| Url::parse(b).ok())
        .and_then(|b| b.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::Document;
    use pretty_assertions::assert_eq;

    const ATOM10: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en" xml:base="https://blog.example/">
  <title type="text">Blog</title>
  <subtitle>Notes</subtitle>
  <link rel="self" href="https://blog.example/atom.xml"/>
  <link rel="alternate" type="text/html" href="https://blog.example/"/>
  <updated>2024-05-01T08:00:00Z</updated>
  <author><name>Sam</name><email>sam@blog.example</email></author>
  <entry>
    <id>urn:uuid:1</id>
    <title type="html">One &amp;amp; two</title>
    <link href="posts/1"/>
    <link rel="enclosure" href="media/1.ogg" type="audio/ogg" length="99"/>
    <published>2024-04-30T08:00:00Z</published>
    <updated>2024-05-01T08:00:00Z</updated>
    <summary>Sum</summary>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Hi <b>there</b></p></div></content>
    <category term="rust"/>
  </entry>
  <entry>
    <id>urn:uuid:2</id>
    <title>Two</title>
    <author><name>Kim</name></author>
    <updated>2024-05-02T08:00:00Z</updated>
  </entry>
</feed>"#;

    fn decode(xml: &str) -> Feed {
        let doc = Document::parse(xml, "");
        let mut feed = Feed::default();
        AtomDecoder.decode(&mut feed, doc.root().unwrap()).unwrap();
        feed
    }

    #[test]
    fn decodes_feed_metadata() {
        let feed = decode(ATOM10);
        assert_eq!(feed.title, "Blog");
        assert_eq!(feed.title_type.as_deref(), Some("text"));
        assert_eq!(feed.link, "https://blog.example/");
        assert_eq!(feed.description, "Notes");
        assert_eq!(feed.pub_date, "2024-05-01T08:00:00Z");
        assert_eq!(feed.language.as_deref(), Some("en"));
        assert_eq!(feed.managing_editor.as_deref(), Some("Sam"));
        assert_eq!(feed.items.len(), 2);
    }

    #[test]
    fn decodes_entry() {
        let feed = decode(ATOM10);
        let entry = &feed.items[0];
        assert_eq!(entry.guid, "urn:uuid:1");
        assert_eq!(entry.title, "One &amp; two");
        assert_eq!(entry.title_type.as_deref(), Some("html"));
        assert_eq!(entry.link, "https://blog.example/posts/1");
        assert_eq!(entry.author, "Sam");
        assert_eq!(entry.author_email.as_deref(), Some("sam@blog.example"));
        assert_eq!(entry.description, "Sum");
        assert_eq!(entry.content, "<p>Hi <b>there</b></p>");
        assert_eq!(entry.pub_date, "2024-04-30T08:00:00Z");
        assert_eq!(entry.published, Some(1714464000));
        assert_eq!(entry.updated, Some(1714550400));
        assert_eq!(entry.categories, vec!["rust"]);
        assert_eq!(entry.enclosures.len(), 1);
        assert_eq!(entry.enclosures[0].url, "https://blog.example/media/1.ogg");
        assert_eq!(entry.enclosures[0].length, 99);
    }

    #[test]
    fn entry_author_and_date_fallbacks() {
        let feed = decode(ATOM10);
        let entry = &feed.items[1];
        assert_eq!(entry.author, "Kim");
        assert_eq!(entry.author_email, None);
        assert_eq!(entry.pub_date, "2024-05-02T08:00:00Z");
        assert_eq!(entry.published, entry.updated);
    }

    #[test]
    fn atom03_elements() {
        let feed = decode(
            r#"<feed version="0.3" xmlns="http://purl.org/atom/ns#">
                 <title mode="escaped" type="text/html">Old &amp;lt;b&amp;gt;</title>
                 <tagline>Legacy</tagline>
                 <link rel="alternate" type="text/html" href="https://old.example/"/>
                 <modified>2005-07-01T00:00:00Z</modified>
                 <entry>
                   <title>E</title>
                   <link rel="alternate" href="https://old.example/e"/>
                   <id>tag:old.example,2005:e</id>
                   <issued>2005-06-30T00:00:00Z</issued>
                   <modified>2005-07-01T00:00:00Z</modified>
                   <content type="application/xhtml+xml" mode="xml"><p>x</p></content>
                 </entry>
               </feed>"#,
        );
        assert_eq!(feed.title, "Old &lt;b&gt;");
        assert_eq!(feed.description, "Legacy");
        assert_eq!(feed.link, "https://old.example/");
        assert_eq!(feed.pub_date, "2005-07-01T00:00:00Z");
        let entry = &feed.items[0];
        assert_eq!(entry.pub_date, "2005-06-30T00:00:00Z");
        assert_eq!(entry.content, "<p>x</p>");
    }

    #[test]
    fn foreign_namespace_is_followed() {
        let feed = decode(
            r#"<feed version="0.3" xmlns="http://example.com/not-atom">
                 <title>Foreign</title><entry><title>x</title></entry>
               </feed>"#,
        );
        assert_eq!(feed.title, "Foreign");
        assert_eq!(feed.items.len(), 1);
    }
}
