// Copyright 2026-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wire format for queued records.
//!
//! Every record is a path plus query string relative to the tracking base
//! URL, e.g. `/e?_k=KEY&_c=mobile_app&_u=UA&_p=bob&_n=Signed%20Up&_d=1&_t=...`.
//! The string is computed once, when the record is archived, and replayed
//! verbatim by the sender.

use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::warn;

/// Record properties, kept in caller insertion order.
pub type Properties = IndexMap<String, String>;

const EVENT_PATH: &str = "/e";
const PROPERTIES_PATH: &str = "/s";
const ALIAS_PATH: &str = "/a";

const MAX_ENCODED_KEY_LEN: usize = 255;

/// Everything but `A-Z a-z 0-9 - _ . ~` is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a single query component.
///
/// Bytes outside the unreserved set become `%XX` with uppercase hex. A
/// literal `+` is written as `%20`, the same as a space.
pub fn encode(value: &str) -> String {
    let encoded = utf8_percent_encode(value, QUERY_COMPONENT).to_string();
    // `%` itself is escaped to `%25`, so `%2B` can only come from a `+`.
    encoded.replace("%2B", "%20")
}

/// Builds record query strings for one product key.
#[derive(Debug, Clone)]
pub struct QueryEncoder {
    product_key: String,
    client_type: String,
    user_agent: String,
}

impl QueryEncoder {
    pub fn new(
        product_key: impl Into<String>,
        client_type: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            product_key: product_key.into(),
            client_type: client_type.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn encode_identity(&self, identity: &str) -> String {
        encode(identity)
    }

    pub fn encode_event(&self, name: &str) -> String {
        encode(name)
    }

    /// Encodes properties as `&key=value` pairs in iteration order.
    ///
    /// Entries with an empty key, an empty value, or a key longer than 255
    /// bytes once encoded are dropped with a warning.
    pub fn encode_properties(&self, properties: &Properties) -> String {
        let mut out = String::new();
        for (key, value) in properties {
            if key.is_empty() {
                warn!("Property keys must not be empty strings. Dropping property");
                continue;
            }
            let encoded_key = encode(key);
            if encoded_key.len() > MAX_ENCODED_KEY_LEN {
                warn!(
                    property.key = %key,
                    property.encoded_len = encoded_key.len(),
                    "Property key longer than {MAX_ENCODED_KEY_LEN} characters once encoded. Dropping property"
                );
                continue;
            }
            if value.is_empty() {
                warn!(property.key = %key, "Property values must not be empty. Dropping property");
                continue;
            }
            out.push('&');
            out.push_str(&encoded_key);
            out.push('=');
            out.push_str(&encode(value));
        }
        out
    }

    pub fn create_event_query(
        &self,
        name: &str,
        properties: Option<&Properties>,
        identity: &str,
        timestamp: u64,
    ) -> String {
        let mut query = format!(
            "{EVENT_PATH}?{}&_p={}&_n={}",
            self.common_params(),
            self.encode_identity(identity),
            self.encode_event(name)
        );
        self.append_timestamp_and_properties(&mut query, properties, timestamp);
        query
    }

    pub fn create_properties_query(
        &self,
        properties: Option<&Properties>,
        identity: &str,
        timestamp: u64,
    ) -> String {
        let mut query = format!(
            "{PROPERTIES_PATH}?{}&_p={}",
            self.common_params(),
            self.encode_identity(identity)
        );
        self.append_timestamp_and_properties(&mut query, properties, timestamp);
        query
    }

    /// `_p` carries the old identity and `_n` the new one.
    pub fn create_alias_query(&self, old_identity: &str, new_identity: &str) -> String {
        format!(
            "{ALIAS_PATH}?{}&_p={}&_n={}",
            self.common_params(),
            self.encode_identity(old_identity),
            self.encode_identity(new_identity)
        )
    }

    fn common_params(&self) -> String {
        format!(
            "_k={}&_c={}&_u={}",
            self.product_key, self.client_type, self.user_agent
        )
    }

    fn append_timestamp_and_properties(
        &self,
        query: &mut String,
        properties: Option<&Properties>,
        timestamp: u64,
    ) {
        if !carries_timestamp(properties) {
            query.push_str(&format!("&_d=1&_t={timestamp}"));
        }
        if let Some(properties) = properties {
            query.push_str(&self.encode_properties(properties));
        }
    }
}

fn carries_timestamp(properties: Option<&Properties>) -> bool {
    properties.is_some_and(|p| p.contains_key("_d") && p.contains_key("_t"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> QueryEncoder {
        QueryEncoder::new("KEY", "TYPE", "UA")
    }

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_overrides() {
        assert_eq!(encode("A B+C~D*E"), "A%20B%20C~D%2AE");
    }

    #[test]
    fn test_encode_reserved_characters() {
        assert_eq!(
            encode("!*'();:@&=+$,/?#[]"),
            "%21%2A%27%28%29%3B%3A%40%26%3D%20%24%2C%2F%3F%23%5B%5D"
        );
    }

    #[test]
    fn test_encode_unsafe_characters() {
        assert_eq!(
            encode("<>#%{}|\\^~` []"),
            "%3C%3E%23%25%7B%7D%7C%5C%5E~%60%20%5B%5D"
        );
    }

    #[test]
    fn test_encode_unreserved_untouched() {
        let unreserved = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_.~";
        assert_eq!(encode(unreserved), unreserved);
    }

    #[test]
    fn test_encode_multibyte_utf8() {
        assert_eq!(encode("é"), "%C3%A9");
        // An escaped percent sign must not be mistaken for an escaped plus.
        assert_eq!(encode("%2B"), "%252B");
    }

    #[test]
    fn test_identity_and_event_are_plain_encoding() {
        let e = encoder();
        assert_eq!(e.encode_identity("testuser@example.com"), "testuser%40example.com");
        assert_eq!(e.encode_event("Signed Up"), encode("Signed Up"));
    }

    #[test]
    fn test_encode_properties_drops_invalid_entries() {
        let e = encoder();
        let long_key = "k".repeat(256);
        let properties = props(&[
            ("", "v"),
            ("empty", ""),
            (long_key.as_str(), "v"),
            ("kept", "a b"),
        ]);
        assert_eq!(e.encode_properties(&properties), "&kept=a%20b");
    }

    #[test]
    fn test_encode_properties_key_length_counts_encoded_bytes() {
        let e = encoder();
        // 85 spaces encode to 255 bytes and are kept, 86 encode to 258.
        let at_limit = " ".repeat(85);
        let over_limit = " ".repeat(86);
        let kept = e.encode_properties(&props(&[(at_limit.as_str(), "v")]));
        assert_eq!(kept.len(), 1 + 255 + 2);
        assert!(e
            .encode_properties(&props(&[(over_limit.as_str(), "v")]))
            .is_empty());
    }

    #[test]
    fn test_create_event_query() {
        let e = encoder();
        let query = e.create_event_query("ev", Some(&props(&[("a", "b")])), "id1", 1000);
        assert_eq!(
            query,
            "/e?_k=KEY&_c=TYPE&_u=UA&_p=id1&_n=ev&_d=1&_t=1000&a=b"
        );
    }

    #[test]
    fn test_create_event_query_without_properties() {
        let e = encoder();
        assert_eq!(
            e.create_event_query("Signed Up", None, "bob", 7),
            "/e?_k=KEY&_c=TYPE&_u=UA&_p=bob&_n=Signed%20Up&_d=1&_t=7"
        );
    }

    #[test]
    fn test_caller_timestamp_suppresses_generated_one() {
        let e = encoder();
        let properties = props(&[("_d", "1"), ("_t", "42")]);
        assert_eq!(
            e.create_event_query("ev", Some(&properties), "id1", 1000),
            "/e?_k=KEY&_c=TYPE&_u=UA&_p=id1&_n=ev&_d=1&_t=42"
        );

        // Only one of the two is not enough.
        let partial = props(&[("_t", "42")]);
        assert_eq!(
            e.create_properties_query(Some(&partial), "id1", 1000),
            "/s?_k=KEY&_c=TYPE&_u=UA&_p=id1&_d=1&_t=1000&_t=42"
        );
    }

    #[test]
    fn test_create_properties_query_preserves_order() {
        let e = encoder();
        let properties = props(&[("propertyTwo", "2"), ("propertyOne", "1")]);
        assert_eq!(
            e.create_properties_query(Some(&properties), "testuser@example.com", 5),
            "/s?_k=KEY&_c=TYPE&_u=UA&_p=testuser%40example.com&_d=1&_t=5&propertyTwo=2&propertyOne=1"
        );
    }

    #[test]
    fn test_create_alias_query() {
        let e = encoder();
        assert_eq!(
            e.create_alias_query("old id", "new@example.com"),
            "/a?_k=KEY&_c=TYPE&_u=UA&_p=old%20id&_n=new%40example.com"
        );
    }
}
