//! Continuation metadata carried by list responses.
//!
//! The table service has been observed to report "more rows" in several
//! shapes: a bare `skipToken` field, or a next-page link under one of a few
//! names. [`PageCursor`] is the one place that shape is inspected; everything
//! past it only sees a token or the end of the result set.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde_json::{Map, Value};

/// Field holding a ready-to-use continuation token.
pub const TOKEN_FIELD: &str = "skipToken";

/// Fields that may hold a next-page link, checked in this order.
pub const LINK_FIELDS: [&str; 4] = [
    "nextLink",
    "@odata.nextLink",
    "oDataNextLink",
    "@microsoft.powerapps.data.nextLink",
];

static SKIPTOKEN_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[?&](?:%24|\$)skiptoken=([^&]+)").expect("invalid skiptoken regex")
});

/// Where the next page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Token reported directly by the service.
    Token(String),
    /// Link to the next page that still has to be picked apart.
    Link(String),
    /// Last page reached.
    End,
}

impl PageCursor {
    /// Classifies the metadata of a list response. A non-empty direct token wins over any link.
    pub fn from_metadata(metadata: &Map<String, Value>) -> Self {
        if let Some(token) = non_empty_str(metadata, TOKEN_FIELD) {
            return PageCursor::Token(token.to_string());
        }

        LINK_FIELDS
            .iter()
            .find_map(|field| non_empty_str(metadata, field))
            .map(|link| PageCursor::Link(link.to_string()))
            .unwrap_or(PageCursor::End)
    }

    pub fn is_end(&self) -> bool {
        matches!(self, PageCursor::End)
    }

    /// Resolves the token to send for the next page, or `None` when there is no next page.
    ///
    /// Decoding differs by path: a direct token is returned verbatim; a token
    /// matched out of the raw link query is percent-decoded exactly once, so a
    /// literal `+` survives; the URL-parser fallback applies form decoding, so
    /// a `+` becomes a space. Relative links are resolved against `base`.
    /// Malformed links are logged and treated as the last page.
    pub fn continuation_token(&self, base: &Url) -> Option<String> {
        match self {
            PageCursor::Token(token) => Some(token.clone()),
            PageCursor::Link(link) => token_from_link(link, base),
            PageCursor::End => None,
        }
    }
}

/// Shorthand for classifying `metadata` and resolving its token in one go.
pub fn extract_continuation_token(metadata: &Map<String, Value>, base: &Url) -> Option<String> {
    PageCursor::from_metadata(metadata).continuation_token(base)
}

/// Every `%` must start a two-hex-digit escape.
fn has_valid_escapes(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.iter().enumerate().all(|(index, byte)| {
        *byte != b'%'
            || matches!(
                (bytes.get(index + 1), bytes.get(index + 2)),
                (Some(high), Some(low)) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit()
            )
    })
}

fn non_empty_str<'a>(metadata: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    metadata
        .get(field)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

fn token_from_link(link: &str, base: &Url) -> Option<String> {
    if let Some(captures) = SKIPTOKEN_PARAM.captures(link) {
        let raw = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        if !has_valid_escapes(raw) {
            tracing::warn!("next-page link carries a malformed skiptoken escape");
            return None;
        }
        return match urlencoding::decode(raw) {
            Ok(decoded) => Some(decoded.into_owned()),
            Err(err) => {
                tracing::warn!("next-page link carries an undecodable skiptoken: {}", err);
                None
            }
        };
    }

    let url = match base.join(link) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!("failed to parse next-page link: {}", err);
            return None;
        }
    };

    let token = lookup_query(&url, "$skiptoken").or_else(|| lookup_query(&url, "skiptoken"));
    if token.is_none() {
        tracing::debug!("next-page link has no skiptoken parameter");
    }
    token
}

fn lookup_query(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://org.crm.dynamics.com/").expect("valid base")
    }

    fn metadata(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("metadata must be an object")
    }

    #[test]
    fn direct_token_is_returned_verbatim() {
        let meta = metadata(json!({
            "skipToken": "abc123",
            "@odata.nextLink": "https://org.crm.dynamics.com/api/data/v9.2/x?$skiptoken=other"
        }));

        assert_eq!(PageCursor::from_metadata(&meta), PageCursor::Token("abc123".into()));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("abc123"));
    }

    #[test]
    fn direct_token_is_not_decoded() {
        let meta = metadata(json!({ "skipToken": "abc%20123" }));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("abc%20123"));
    }

    #[test]
    fn link_token_is_percent_decoded_once() {
        let meta = metadata(json!({
            "@odata.nextLink": "https://org.crm.dynamics.com/api/data/v9.2/cr76d_tickets?$skiptoken=abc%20123"
        }));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("abc 123"));
    }

    #[test]
    fn encoded_dollar_and_mixed_case_parameter_match() {
        let meta = metadata(json!({
            "nextLink": "/api/data/v9.2/cr76d_tickets?$select=x&%24SkipToken=%253Ccookie%2520page%253D2%253E"
        }));
        // Decoded exactly once: the doubly-encoded payload keeps one layer.
        assert_eq!(
            extract_continuation_token(&meta, &base()).as_deref(),
            Some("%3Ccookie%20page%3D2%3E")
        );
    }

    #[test]
    fn link_fields_are_checked_in_order() {
        let meta = metadata(json!({
            "oDataNextLink": "https://h/x?$skiptoken=third",
            "@odata.nextLink": "https://h/x?$skiptoken=second",
            "nextLink": ""
        }));
        assert_eq!(
            PageCursor::from_metadata(&meta),
            PageCursor::Link("https://h/x?$skiptoken=second".into())
        );
    }

    #[test]
    fn powerapps_link_field_is_recognised() {
        let meta = metadata(json!({
            "@microsoft.powerapps.data.nextLink": "https://h/x?$skiptoken=pa"
        }));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("pa"));
    }

    #[test]
    fn parser_fallback_reads_plain_skiptoken_and_form_decodes() {
        // No `$` prefix, so the pattern path does not apply.
        let meta = metadata(json!({
            "nextLink": "api/data/v9.2/cr76d_tickets?skiptoken=page+2%21"
        }));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("page 2!"));
    }

    #[test]
    fn pattern_path_keeps_literal_plus() {
        let meta = metadata(json!({ "nextLink": "https://h/x?$skiptoken=page+2" }));
        assert_eq!(extract_continuation_token(&meta, &base()).as_deref(), Some("page+2"));
    }

    #[test]
    fn missing_metadata_means_last_page() {
        let meta = Map::new();
        assert!(PageCursor::from_metadata(&meta).is_end());
        assert_eq!(extract_continuation_token(&meta, &base()), None);
    }

    #[test]
    fn non_string_and_blank_fields_are_ignored() {
        let meta = metadata(json!({ "skipToken": 42, "nextLink": "   " }));
        assert!(PageCursor::from_metadata(&meta).is_end());
    }

    #[test]
    fn link_without_token_degrades_to_none() {
        let meta = metadata(json!({ "nextLink": "https://h/x?$top=50" }));
        assert_eq!(extract_continuation_token(&meta, &base()), None);
    }

    #[test]
    fn malformed_link_degrades_to_none() {
        let meta = metadata(json!({ "nextLink": "http://[::1" }));
        assert_eq!(extract_continuation_token(&meta, &base()), None);
    }

    #[test]
    fn undecodable_pattern_token_degrades_to_none() {
        let meta = metadata(json!({ "nextLink": "https://h/x?$skiptoken=%FF%FE" }));
        assert_eq!(extract_continuation_token(&meta, &base()), None);
    }

    #[test]
    fn malformed_escape_in_token_degrades_to_none() {
        for link in [
            "https://h/x?$skiptoken=%ZZ",
            "https://h/x?$skiptoken=abc%4",
            "https://h/x?$skiptoken=abc%",
        ] {
            let meta = metadata(json!({ "nextLink": link }));
            assert_eq!(extract_continuation_token(&meta, &base()), None, "{link}");
        }

        let meta = metadata(json!({ "nextLink": "https://h/x?$skiptoken=a%2Bb" }));
        assert_eq!(
            extract_continuation_token(&meta, &base()),
            Some("a+b".to_string())
        );
    }
}
