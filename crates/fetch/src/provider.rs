// ABOUTME: HeaderProvider lets callers inject request headers per fetch.
// ABOUTME: Implemented for closures and for a plain HeaderMap.

use reqwest::header::HeaderMap;

/// Adds caller-defined headers to an outgoing request.
///
/// Headers set here are applied after the conditional-GET headers, so a
/// provider may override them.
pub trait HeaderProvider {
    fn add_custom_headers(&self, headers: &mut HeaderMap);
}

impl<F> HeaderProvider for F
where
    F: Fn(&mut HeaderMap),
{
    fn add_custom_headers(&self, headers: &mut HeaderMap) {
        self(headers)
    }
}

impl HeaderProvider for HeaderMap {
    fn add_custom_headers(&self, headers: &mut HeaderMap) {
        for (name, value) in self {
            headers.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, AUTHORIZATION, IF_NONE_MATCH};

    #[test]
    fn closure_provider() {
        let provider = |headers: &mut HeaderMap| {
            headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        };
        let mut headers = HeaderMap::new();
        provider.add_custom_headers(&mut headers);
        assert_eq!(headers[AUTHORIZATION], "Bearer t");
    }

    #[test]
    fn header_map_provider_overrides() {
        let mut provided = HeaderMap::new();
        provided.insert(IF_NONE_MATCH, HeaderValue::from_static("\"mine\""));

        let mut headers = HeaderMap::new();
        headers.insert(IF_NONE_MATCH, HeaderValue::from_static("\"theirs\""));
        provided.add_custom_headers(&mut headers);
        assert_eq!(headers[IF_NONE_MATCH], "\"mine\"");
        assert_eq!(headers.len(), 1);
    }
}
