// ABOUTME: Decoder for the <rss> family: RSS 0.91, 0.92, 0.94 and 2.0.
// ABOUTME: Reads channel metadata and items, with Dublin Core and content:encoded fallbacks.

use super::{epoch, first_non_empty, text_of, Decoder};
use crate::error::FeedError;
use crate::models::{Enclosure, Feed, FeedItem};
use crate::namespaces::{CONTENT_URI, DC_URI};
use crate::xml::Node;

/// Decodes `<rss version="...">` documents. Elements carry no namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct RssDecoder;

impl Decoder for RssDecoder {
    fn decode(&self, feed: &mut Feed, root: Node<'_>) -> Result<(), FeedError> {
        let Some(channel) = root.child("channel", None) else {
            tracing::debug!("rss document has no channel");
            return Ok(());
        };

        feed.title = text_of(channel, "title", None);
        feed.link = text_of(channel, "link", None);
        feed.description = text_of(channel, "description", None);
        feed.language = channel
            .child_text("language", None)
            .or_else(|| channel.child_text("language", Some(DC_URI)))
            .filter(|s| !s.is_empty());
        feed.pub_date = first_non_empty([
            channel.child_text("pubDate", None),
            channel.child_text("lastBuildDate", None),
            channel.child_text("date", Some(DC_URI)),
        ]);
        feed.managing_editor = channel
            .child_text("managingEditor", None)
            .filter(|s| !s.is_empty());

        // 0.91 documents in the wild sometimes put items next to the channel.
        let items = channel
            .elements()
            .chain(root.elements())
            .filter(|n| n.has_name("item", None));
        feed.items = items.map(decode_item).collect();

        Ok(())
    }
}

fn decode_item(item: Node<'_>) -> FeedItem {
    let (author, author_email) = split_author(&first_non_empty([
        item.child_text("author", None),
        item.child_text("creator", Some(DC_URI)),
    ]));

    let pub_date = first_non_empty([
        item.child_text("pubDate", None),
        item.child_text("date", Some(DC_URI)),
    ]);

    let guid_node = item.child("guid", None);
    let guid = guid_node
        .map(|n| n.text().trim().to_string())
        .unwrap_or_default();
    let guid_is_permalink = !guid.is_empty()
        && guid_node
            .and_then(|n| n.attribute("isPermaLink"))
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);

    let mut link = text_of(item, "link", None);
    if link.is_empty() && guid_is_permalink {
        link = guid.clone();
    }

    let enclosures = item
        .elements()
        .filter(|n| n.has_name("enclosure", None))
        .filter_map(|n| {
            let url = n.attribute("url")?.trim();
            if url.is_empty() {
                return None;
            }
            Some(Enclosure {
                url: url.to_string(),
                mime_type: n.attribute("type").map(|t| t.trim().to_string()),
                length: n
                    .attribute("length")
                    .and_then(|l| l.trim().parse().ok())
                    .unwrap_or(0),
            })
        })
        .collect();

    let categories = item
        .elements()
        .filter(|n| n.has_name("category", None) || n.has_name("subject", Some(DC_URI)))
        .map(|n| n.text().trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    FeedItem {
        title: text_of(item, "title", None),
        link,
        author,
        author_email,
        description: text_of(item, "description", None),
        content: text_of(item, "encoded", Some(CONTENT_URI)),
        published: epoch(&pub_date),
        pub_date,
        guid,
        guid_is_permalink,
        enclosures,
        categories,
        base: item.xml_base(),
        ..Default::default()
    }
}

/// Splits RSS's `email (Name)` author convention.
fn split_author(raw: &str) -> (String, Option<String>) {
    let raw = raw.trim();
    if let Some((email, rest)) = raw.split_once('(') {
        let email = email.trim();
        if email.contains('@') && rest.ends_with(')') {
            let name = rest.trim_end_matches(')').trim();
            return (name.to_string(), Some(email.to_string()));
        }
    }
    if raw.contains('@') && !raw.contains(char::is_whitespace) {
        return (String::new(), Some(raw.to_string()));
    }
    (raw.to_string(), None)
}
