//! Inbound lead submissions: turning a raw poster request into the
//! canonical field map, or a structured error the transport can write
//! straight back.

use http::Method;
use serde_json::Value;
use url::Url;

use crate::api::{InboundError, Request};
use crate::fields::{self, FieldMap};
use crate::mime::{self, MimeType, BODY_MIME_TYPES, RESPONSE_MIME_TYPES};
use crate::uri;
use crate::xml;

/// Normalizes an inbound submission into a canonical field map.
///
/// Only GET and POST are allowed. Query parameters always contribute; a POST
/// body in any supported format contributes too, with query values winning on
/// collision. All failures carry the HTTP status and message the poster
/// should receive.
pub fn normalize(req: &Request) -> Result<FieldMap, InboundError> {
    if req.method != Method::GET && req.method != Method::POST {
        return Err(InboundError::MethodNotAllowed(
            req.method.as_str().to_uppercase(),
        ));
    }

    // The Accept header decides the error-body and response encoding; an
    // unsatisfiable one fails the whole request up front.
    if mime::best_match(&RESPONSE_MIME_TYPES, req.header("accept")).is_none() {
        return Err(InboundError::NotAcceptable);
    }

    let flat_query = uri::parse_query(&req.uri);
    validate_redir_url(&flat_query)?;
    let mut query = fields::unflatten(flat_query)
        .map_err(|e| InboundError::BadQuery(e.to_string()))?;

    let ping = uri::is_ping(&req.uri);
    normalize_trustedform(&mut query, ping);

    if req.method == Method::GET || !signals_body(req) {
        return Ok(query);
    }

    let content_type = req
        .header("content-type")
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(InboundError::MissingContentType)?;
    let mime_type = mime::best_match(&BODY_MIME_TYPES, Some(content_type)).ok_or_else(|| {
        InboundError::UnsupportedContentType(mime::supported_list(&BODY_MIME_TYPES))
    })?;

    let body = req.body.as_deref().map(str::trim).unwrap_or("");
    if body.is_empty() {
        return Ok(query);
    }

    let mut parsed = parse_body(body, mime_type)?;
    fields::deep_merge(&mut parsed, query);
    normalize_trustedform(&mut parsed, ping);
    Ok(parsed)
}

/// A body is only expected when the poster signaled one.
fn signals_body(req: &Request) -> bool {
    req.headers.contains_key("content-length")
        || req
            .header("transfer-encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
}

fn parse_body(body: &str, mime_type: MimeType) -> Result<FieldMap, InboundError> {
    match mime_type {
        MimeType::UrlEncoded => {
            let pairs = url::form_urlencoded::parse(body.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()));
            fields::unflatten(uri::pairs_to_map(pairs)).map_err(|e| {
                tracing::debug!(error = %e, "rejecting unparseable form body");
                InboundError::BadBody(e.to_string())
            })
        }
        MimeType::Json => parse_json_body(body),
        MimeType::XmlApplication | MimeType::XmlText => match xml::parse(body) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => {
                let mut map = FieldMap::new();
                if let Value::String(text) = other {
                    if !text.is_empty() {
                        map.insert("_".to_string(), Value::String(text));
                    }
                }
                Ok(map)
            }
            Err(e) => {
                tracing::debug!(error = %e, "rejecting unparseable XML body");
                Err(InboundError::BadXmlBody(single_line(&e.to_string())))
            }
        },
        MimeType::TextPlain => Ok(FieldMap::new()),
    }
}

/// Error messages travel in single-line response bodies.
fn single_line(message: &str) -> String {
    message
        .split(['\r', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// JSON gets one recovery attempt: some posters embed raw control characters
/// inside string literals, which strict parsing rejects.
fn parse_json_body(body: &str) -> Result<FieldMap, InboundError> {
    let parsed: Result<Value, _> = serde_json::from_str(body).or_else(|_| {
        let stripped: String = body.chars().filter(|c| !matches!(c, '\r' | '\n' | '\t')).collect();
        serde_json::from_str(&stripped)
    });
    match parsed {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(FieldMap::new()),
        Err(e) => {
            tracing::debug!(error = %e, "rejecting unparseable JSON body");
            Err(InboundError::BadBody(e.to_string()))
        }
    }
}

/// `redir_url`, when present, must be an absolute http(s) URL. Multiple
/// values are tolerated; only the first is validated, since only the first
/// is ever used.
fn validate_redir_url(query: &FieldMap) -> Result<(), InboundError> {
    let value = match first_value(query.get("redir_url")) {
        Some(value) => value,
        None => return Ok(()),
    };
    let url = Url::parse(value).map_err(|_| InboundError::InvalidRedirUrl)?;
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        _ => Err(InboundError::InvalidRedirUrl),
    }
}

/// First scalar out of a possibly multi-valued field.
pub(crate) fn first_value(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => match items.first() {
            Some(Value::String(s)) => Some(s),
            _ => None,
        },
        _ => None,
    }
}

/// TrustedForm field aliasing.
///
/// `xxTrustedFormCertUrl` (any casing) renames to `trustedform_cert_url`;
/// `xxTrustedFormPingUrl` and `trustedform_ping_url` are captured as ping-url
/// candidates. Both source spellings always disappear. On a ping request the
/// ping url, when present, takes the cert url's place.
pub(crate) fn normalize_trustedform(map: &mut FieldMap, ping: bool) {
    let mut cert_url = None;
    let mut ping_url = None;
    let aliased: Vec<String> = map
        .keys()
        .filter(|k| {
            let lower = k.to_lowercase();
            lower == "xxtrustedformcerturl"
                || lower == "xxtrustedformpingurl"
                || lower == "trustedform_ping_url"
        })
        .cloned()
        .collect();
    for key in aliased {
        let lower = key.to_lowercase();
        if let Some(value) = map.remove(&key) {
            if lower == "xxtrustedformcerturl" {
                cert_url = Some(value);
            } else {
                ping_url = Some(value);
            }
        }
    }
    let chosen = match (ping, ping_url) {
        (true, Some(url)) => Some(url),
        (_, _) => cert_url,
    };
    if let Some(url) = chosen {
        map.insert("trustedform_cert_url".to_string(), url);
    }
}
