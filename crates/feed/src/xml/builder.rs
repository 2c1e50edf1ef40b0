// ABOUTME: Lenient tree builder turning quick-xml events into a Document.
// ABOUTME: Recovers from unclosed/mismatched tags, stray ampersands and unknown entities.

use std::borrow::Cow;

use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::{Attribute, Document, ElementData, NodeId, NodeKind, MAX_DEPTH};

/// An element that has been started but not yet closed.
struct OpenElement {
    id: NodeId,
    qname: String,
}

pub(super) fn build(text: &str, url: &str) -> Document {
    let mut doc = Document::empty(url);
    let source = escape_stray_ampersands(text);
    let mut reader = Reader::from_str(&source);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.check_comments = false;
        config.expand_empty_elements = false;
    }

    let mut stack: Vec<OpenElement> = Vec::new();
    let mut last_error_at = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(err) => {
                let position = reader.buffer_position();
                debug!(url = %url, position, error = %err, "recovering from malformed markup");
                // Give up once the reader stops making progress.
                if last_error_at.is_some_and(|at| position <= at) {
                    break;
                }
                last_error_at = Some(position);
                continue;
            }
        };

        match event {
            Event::Decl(decl) => {
                if doc.encoding.is_none() && doc.root.is_none() {
                    if let Some(Ok(encoding)) = decl.encoding() {
                        let encoding = String::from_utf8_lossy(&encoding).trim().to_string();
                        if !encoding.is_empty() {
                            doc.encoding = Some(encoding);
                        }
                    }
                }
            }
            Event::Start(start) => {
                if stack.len() >= MAX_DEPTH {
                    debug!(url = %url, depth = stack.len(), "excessive nesting, stopping");
                    break;
                }
                match open_element(&mut doc, &stack, &start) {
                    Some(id) => stack.push(OpenElement {
                        id,
                        qname: qualified_name(&start),
                    }),
                    None => break,
                }
            }
            Event::Empty(start) => {
                if stack.len() >= MAX_DEPTH {
                    debug!(url = %url, depth = stack.len(), "excessive nesting, stopping");
                    break;
                }
                if open_element(&mut doc, &stack, &start).is_none() {
                    break;
                }
            }
            Event::End(end) => {
                let qname = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                match stack.iter().rposition(|open| open.qname == qname) {
                    Some(index) => {
                        if index + 1 != stack.len() {
                            debug!(url = %url, tag = %qname, "closing unterminated elements");
                        }
                        stack.truncate(index);
                    }
                    None => debug!(url = %url, tag = %qname, "ignoring stray end tag"),
                }
            }
            Event::Text(text) => {
                if let Some(open) = stack.last() {
                    if let Ok(raw) = text.decode() {
                        let value = if raw.contains('&') {
                            unescape(&raw).map(Cow::into_owned).unwrap_or_else(|_| raw.into_owned())
                        } else {
                            raw.into_owned()
                        };
                        doc.append_text(open.id, &value);
                    }
                }
            }
            Event::CData(cdata) => {
                if let Some(open) = stack.last() {
                    let value = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                    doc.append_text(open.id, &value);
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(open) = stack.last() {
                    if let Ok(name) = reference.decode() {
                        let value = resolve_reference(&name);
                        doc.append_text(open.id, &value);
                    }
                }
            }
            Event::Eof => break,
            // Comments, processing instructions and DOCTYPE carry nothing we keep.
            _ => {}
        }
    }

    if !stack.is_empty() {
        debug!(url = %url, open = stack.len(), "closing elements left open at end of input");
    }
    doc
}

/// Creates the element for `start` under the innermost open element.
///
/// Returns `None` when a second top-level element appears; everything after
/// the first root is extra content and is dropped.
fn open_element(doc: &mut Document, stack: &[OpenElement], start: &BytesStart<'_>) -> Option<NodeId> {
    let parent = stack.last().map(|open| open.id);
    if parent.is_none() && doc.root.is_some() {
        debug!(url = %doc.url, "ignoring content after the root element");
        return None;
    }

    let qname = qualified_name(start);
    let (prefix, name) = split_qname(&qname);

    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in start.attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value).into_owned();
        let value = if raw.contains('&') {
            unescape(&raw).map(Cow::into_owned).unwrap_or(raw)
        } else {
            raw
        };
        if key == "xmlns" {
            declarations.push((None, value));
        } else if let Some(p) = key.strip_prefix("xmlns:") {
            declarations.push((Some(p.to_string()), value));
        } else {
            raw_attributes.push((key, value));
        }
    }

    let id = doc.push(
        parent,
        NodeKind::Element(ElementData {
            name: name.to_string(),
            prefix: prefix.map(String::from),
            namespace: None,
            attributes: Vec::new(),
            declarations,
        }),
    );
    if parent.is_none() {
        doc.root = Some(id);
    }

    let namespace = doc.lookup_namespace(id, prefix);
    let attributes = raw_attributes
        .into_iter()
        .map(|(key, value)| {
            let (attr_prefix, attr_name) = split_qname(&key);
            // Unprefixed attributes are never in the default namespace.
            let attr_namespace = attr_prefix.and_then(|p| doc.lookup_namespace(id, Some(p)));
            Attribute {
                name: attr_name.to_string(),
                prefix: attr_prefix.map(String::from),
                namespace: attr_namespace,
                value,
            }
        })
        .collect();

    if let NodeKind::Element(el) = &mut doc.nodes[id.0].kind {
        el.namespace = namespace;
        el.attributes = attributes;
    }
    Some(id)
}

fn qualified_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, qname),
    }
}

/// Expands a character or entity reference; unknown entities are kept literally.
fn resolve_reference(name: &str) -> String {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        if let Some(ch) = code.and_then(char::from_u32) {
            return ch.to_string();
        }
    } else if let Some(value) = resolve_predefined_entity(name) {
        return value.to_string();
    } else if let Some(value) = resolve_html5_entity(name) {
        return value.to_string();
    }
    format!("&{};", name)
}

/// Rewrites `&` that does not start a well-formed reference as `&amp;`,
/// leaving CDATA sections and comments untouched.
fn escape_stray_ampersands(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    let mut changed = false;
    while let Some(pos) = rest.find(['&', '<']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if rest.starts_with('<') {
            let skip = if rest.starts_with("<![CDATA[") {
                rest.find("]]>").map(|end| end + 3)
            } else if rest.starts_with("<!--") {
                rest.find("-->").map(|end| end + 3)
            } else {
                Some(1)
            };
            let skip = skip.unwrap_or(rest.len());
            out.push_str(&rest[..skip]);
            rest = &rest[skip..];
            continue;
        }

        if is_reference(&rest[1..]) {
            out.push('&');
        } else {
            out.push_str("&amp;");
            changed = true;
        }
        rest = &rest[1..];
    }
    out.push_str(rest);

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

/// True if `s` (the text after an `&`) begins with `name;`, `#123;` or `#x1F;`.
fn is_reference(s: &str) -> bool {
    let Some(end) = s.find(';') else {
        return false;
    };
    let body = &s[..end];
    if let Some(number) = body.strip_prefix('#') {
        return match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        };
    }
    let mut chars = body.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    }
}
