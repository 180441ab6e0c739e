use serde_json::Value;
use url::form_urlencoded;

use crate::fields::FieldMap;

/// Parses the query component of a URI into a field map.
///
/// Values are percent-decoded; a key appearing more than once collects its
/// values into a list in appearance order. Malformed or absent queries yield
/// an empty map rather than an error.
pub fn parse_query(uri: &str) -> FieldMap {
    let after_path = match uri.split_once('?') {
        Some((_, rest)) => rest,
        None => return FieldMap::new(),
    };
    let query = after_path.split('#').next().unwrap_or("");
    pairs_to_map(form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())))
}

/// Collects decoded key/value pairs, turning repeated keys into lists.
pub fn pairs_to_map(pairs: impl Iterator<Item = (String, String)>) -> FieldMap {
    let mut map = FieldMap::new();
    for (key, value) in pairs {
        if key.is_empty() {
            continue;
        }
        let value = Value::String(value);
        match map.get_mut(&key) {
            None => {
                map.insert(key, value);
            }
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    map
}

/// True iff the request path ends in `/ping`, ignoring query, fragment,
/// scheme and authority. Anything unparseable is not a ping.
pub fn is_ping(uri: &str) -> bool {
    let path = match url::Url::parse(uri) {
        Ok(parsed) => return parsed.path().ends_with("/ping"),
        // Relative reference; strip query/fragment by hand.
        Err(_) => uri.split(['?', '#']).next().unwrap_or(""),
    };
    path.ends_with("/ping")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_values_stay_scalar() {
        let query = parse_query("/flows/1/sources/2/submit?foo=bar&baz=bip");
        assert_eq!(query.get("foo"), Some(&json!("bar")));
        assert_eq!(query.get("baz"), Some(&json!("bip")));
    }

    #[test]
    fn repeated_keys_collect_in_order() {
        let query = parse_query("/submit?foo=bar&foo=baz");
        assert_eq!(query.get("foo"), Some(&json!(["bar", "baz"])));
    }

    #[test]
    fn percent_decoding() {
        let query = parse_query("/submit?redir_url=http%3A%2F%2Ffoo%2Fbar%3Fbaz%3Dbip&name=a+b");
        assert_eq!(query.get("redir_url"), Some(&json!("http://foo/bar?baz=bip")));
        assert_eq!(query.get("name"), Some(&json!("a b")));
    }

    #[test]
    fn no_query_is_empty() {
        assert!(parse_query("/flows/1/sources/2/submit").is_empty());
        assert!(parse_query("").is_empty());
        assert!(parse_query("/submit?").is_empty());
    }

    #[test]
    fn fragment_is_ignored() {
        let query = parse_query("/submit?a=1#b=2");
        assert_eq!(query.get("a"), Some(&json!("1")));
        assert_eq!(query.len(), 1);
    }

    #[test]
    fn recognizes_non_pings() {
        assert!(!is_ping(""));
        assert!(!is_ping("xyz"));
        assert!(!is_ping("https://example.com/flows/123/sources/456/pong"));
        assert!(!is_ping("https://example.com/flows/123/sources/456/submit?type=ping"));
    }

    #[test]
    fn recognizes_pings() {
        assert!(is_ping("/flows/123/sources/ping"));
        assert!(is_ping("https://example.com/flows/123/sources/456/ping"));
        assert!(is_ping("https://example.com/flows/123/sources/456/ping?type=whatever"));
    }
}
