// ABOUTME: Namespace URIs used to classify and decode syndication documents.
// ABOUTME: Covers Atom 0.3/1.0, RSS 1.0/RDF and the common RSS extension modules.

pub const ATOM_0_3_URI: &str = "http://purl.org/atom/ns#";
pub const ATOM_1_0_URI: &str = "http://www.w3.org/2005/Atom";

pub const RDF_URI: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RSS_1_0_URI: &str = "http://purl.org/rss/1.0/";
/// Some RSS 0.90 era documents still put channel/items in this namespace.
pub const RSS_0_90_URI: &str = "http://my.netscape.com/rdf/simple/0.9/";

pub const DC_URI: &str = "http://purl.org/dc/elements/1.1/";
pub const CONTENT_URI: &str = "http://purl.org/rss/1.0/modules/content/";
pub const MEDIA_RSS_URI: &str = "http://search.yahoo.com/mrss/";
pub const XHTML_URI: &str = "http://www.w3.org/1999/xhtml";

/// Bound to the `xml` prefix by definition.
pub const XML_URI: &str = "http://www.w3.org/XML/1998/namespace";
