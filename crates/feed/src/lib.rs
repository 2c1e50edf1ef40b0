// ABOUTME: Core feed library for syndic: XML tree, format detection, decoders and encodings.
// ABOUTME: Turns RSS 0.9x/1.0/2.0 and Atom 0.3/1.0 documents into one Feed model.

pub mod decoders;
pub mod detect;
pub mod encoding;
pub mod error;
pub mod models;
pub mod namespaces;
pub mod parser;
pub mod time_parse;
pub mod xml;

pub use decoders::{AtomDecoder, Decoder, DecoderRegistry, RdfDecoder, RssDecoder};
pub use detect::classify;
pub use encoding::{normalize, sniff_document, CANONICAL_ENCODING, DEFAULT_CHARSET};
pub use error::{BoxError, DecodeError, FeedError};
pub use models::{Enclosure, Feed, FeedItem, FormatVariant};
pub use parser::{parse_feed_bytes, FeedParser};
pub use time_parse::{format_http_date, parse_flexible_time, parse_http_date};
pub use xml::{Document, Node};
