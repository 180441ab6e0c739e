//! Forwarding a lead to a buyer: building the delivery request, interpreting
//! whatever comes back, and sanity-checking the delivery configuration.

use http::{HeaderMap, HeaderValue, Method};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::api::{content_length_header, Response};
use crate::fields::{self, FieldMap};
use crate::mime::{self, MimeType, OUTBOUND_MIME_TYPES};
use crate::xml;

/// The resource content types we prefer from a buyer's server, best first.
pub const ACCEPT_HEADER: &str = "application/json;q=0.9,text/xml;q=0.8,application/xml;q=0.7";

/// Delivery configuration plus the lead to send.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutboundVars {
    pub url: Option<String>,
    pub method: Option<String>,
    pub default_outcome: Option<String>,
    #[serde(default)]
    pub lead: Value,
    #[serde(default)]
    pub custom: Option<Value>,
    pub price: Option<f64>,
}

/// A request descriptor for the transport layer to deliver.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub url: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

#[derive(Error, Debug)]
pub enum OutboundError {
    #[error("{0} is not a supported delivery method")]
    UnsupportedMethod(String),
    #[error("no delivery url configured")]
    MissingUrl,
    #[error("error parsing delivery url")]
    ParseUrlError(#[from] url::ParseError),
    #[error("error encoding form body")]
    EncodeError(#[from] serde_urlencoded::ser::Error),
}

/// Flattens the lead into wire fields and builds the GET or POST request.
///
/// Custom fields override standard ones only when their value carries
/// information; `price` is always present, defaulting to 0. For GET the
/// fields merge into the target URL's existing query string, new values
/// winning in place; for POST they become a form body.
pub fn build_request(vars: &OutboundVars) -> Result<OutboundRequest, OutboundError> {
    let url = vars.url.as_deref().ok_or(OutboundError::MissingUrl)?;
    let data = assemble_fields(vars);

    let mut headers = HeaderMap::new();
    headers.insert(http::header::ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));

    match vars.method.as_deref().unwrap_or("POST").to_uppercase().as_str() {
        "GET" => {
            let mut target = Url::parse(url)?;
            let mut pairs: Vec<(String, String)> = target
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            for (key, value) in &data {
                let rendered = fields::scalar_to_string(value);
                match pairs.iter().position(|(existing, _)| existing == key) {
                    Some(index) => {
                        // Overriding a key collapses any repeats of it, keeping
                        // the first occurrence's position.
                        pairs[index].1 = rendered;
                        let mut i = index + 1;
                        while i < pairs.len() {
                            if pairs[i].0 == *key {
                                pairs.remove(i);
                            } else {
                                i += 1;
                            }
                        }
                    }
                    None => pairs.push((key.clone(), rendered)),
                }
            }
            target
                .query_pairs_mut()
                .clear()
                .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            Ok(OutboundRequest {
                url: target.to_string(),
                method: Method::GET,
                headers,
                body: None,
            })
        }
        "POST" => {
            let pairs: Vec<(String, String)> = data
                .iter()
                .map(|(k, v)| (k.clone(), fields::scalar_to_string(v)))
                .collect();
            let body = serde_urlencoded::to_string(&pairs)?;
            headers.insert(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static(MimeType::UrlEncoded.as_str()),
            );
            content_length_header(&mut headers, &body);
            Ok(OutboundRequest {
                url: url.to_string(),
                method: Method::POST,
                headers,
                body: Some(body),
            })
        }
        other => Err(OutboundError::UnsupportedMethod(other.to_string())),
    }
}

fn assemble_fields(vars: &OutboundVars) -> FieldMap {
    let mut data = fields::flatten(&vars.lead);
    if let Some(custom) = &vars.custom {
        for (key, value) in fields::flatten(custom) {
            if fields::is_truthy(&value) {
                data.insert(key, value);
            }
        }
    }
    data.insert("price".to_string(), price_value(vars.price.unwrap_or(0.0)));
    data
}

// Whole prices print without a fractional part, the way they appear in bids.
fn price_value(price: f64) -> Value {
    if price.fract() == 0.0 && price.is_finite() && price.abs() < i64::MAX as f64 {
        Value::from(price as i64)
    } else {
        Value::from(price)
    }
}

/// Interprets a buyer's response as an outcome event.
///
/// Never fails: missing or unsupported content types, unparseable bodies and
/// responses without an `outcome` all degrade to a synthesized event so the
/// caller always has something actionable.
pub fn parse_response(vars: &OutboundVars, res: &Response) -> FieldMap {
    let content_type = match res.header("content-type") {
        Some(value) => value,
        None => return error_event("No Content-Type specified in server response"),
    };
    let mime_type = match mime::best_match(&OUTBOUND_MIME_TYPES, Some(content_type)) {
        Some(mime_type) => mime_type,
        None => return error_event("Unsupported Content-Type specified in server response"),
    };

    let parsed = match mime_type {
        MimeType::Json => serde_json::from_str(&res.body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "buyer response is not parseable JSON");
            Value::Null
        }),
        MimeType::XmlApplication | MimeType::XmlText => xml::parse(&res.body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "buyer response is not parseable XML");
            Value::Null
        }),
        _ => Value::Null,
    };

    let event = match parsed {
        Value::Object(map) => map,
        _ => FieldMap::new(),
    };
    if matches!(event.get("outcome"), Some(v) if !v.is_null()) {
        return event;
    }

    // No outcome offered; synthesize one from the configuration and whatever
    // explanation the response carried.
    let outcome = vars.default_outcome.clone().unwrap_or_else(|| "error".to_string());
    let reason = [event.get("reason"), event.get("message")]
        .into_iter()
        .flatten()
        .find(|v| fields::is_truthy(v))
        .cloned()
        .unwrap_or_else(|| Value::String("Unrecognized response".to_string()));

    let mut synthesized = FieldMap::new();
    synthesized.insert("outcome".to_string(), Value::String(outcome));
    synthesized.insert("reason".to_string(), reason);
    synthesized
}

fn error_event(reason: &str) -> FieldMap {
    let mut event = FieldMap::new();
    event.insert("outcome".to_string(), Value::String("error".to_string()));
    event.insert("reason".to_string(), Value::String(reason.to_string()));
    event
}

/// Checks the delivery configuration before any network activity.
///
/// Returns a human-readable problem description, or `None` when the
/// configuration is deliverable.
pub fn validate(vars: &OutboundVars) -> Option<String> {
    if let Some(outcome) = vars.default_outcome.as_deref() {
        if !matches!(outcome, "success" | "failure" | "error") {
            return Some("default outcome must be \"success\", \"failure\" or \"error\"".to_string());
        }
    }

    let url = match vars.url.as_deref() {
        Some(url) => url,
        None => return Some("URL is required".to_string()),
    };
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {}
        _ => return Some("URL must be valid".to_string()),
    }

    let method = vars.method.as_deref().unwrap_or("POST").to_uppercase();
    if method != "GET" && method != "POST" {
        return Some("Unsupported HTTP method - use GET or POST".to_string());
    }
    None
}
