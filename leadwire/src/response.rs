//! Building the HTTP response a poster receives, in whatever format its
//! Accept header negotiated.

use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

use crate::api::{content_length_header, location_header, Request, Response};
use crate::fields::{self, FieldMap};
use crate::inbound::first_value;
use crate::mime::{self, MimeType, RESPONSE_MIME_TYPES};
use crate::uri;
use crate::xml;

/// Fields emitted when the handler does not ask for specific ones.
pub const DEFAULT_RESPONSE_FIELDS: [&str; 4] = ["outcome", "reason", "lead.id", "price"];

/// Serializes outcome variables into the response for an inbound submission.
///
/// Ping requests get special treatment: no lead id, a forced `failure`
/// outcome when there is no positive bid price, and a 200 instead of a 201.
/// A `redir_url` query parameter on the original request turns the whole
/// thing into a 303 redirect regardless of outcome.
pub fn respond(req: &Request, vars: &FieldMap, field_spec: Option<&[&str]>) -> Response {
    let mime_type =
        mime::best_match(&RESPONSE_MIME_TYPES, req.header("accept")).unwrap_or(MimeType::Json);

    let mut vars = vars.clone();
    let mut field_ids: Vec<&str> = field_spec
        .unwrap_or(&DEFAULT_RESPONSE_FIELDS)
        .to_vec();

    let mut status = StatusCode::CREATED;
    if uri::is_ping(&req.uri) {
        // The handler does not assign lead ids to pings.
        field_ids.retain(|f| *f != "lead.id");
        if !has_positive_price(&vars) {
            vars.insert("outcome".to_string(), Value::String("failure".to_string()));
            if !is_set(vars.get("reason")) {
                vars.insert("reason".to_string(), Value::String("no bid".to_string()));
            }
        }
        status = StatusCode::OK;
    }

    let body = build_body(mime_type, &field_ids, &vars);

    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static(mime_type.as_str()),
    );
    content_length_header(&mut headers, &body);

    // A redirect overrides whatever status the outcome earned.
    let query = uri::parse_query(&req.uri);
    if let Some(redir_url) = first_value(query.get("redir_url")) {
        location_header(&mut headers, redir_url);
        status = StatusCode::SEE_OTHER;
    }

    Response {
        status,
        headers,
        body,
    }
}

fn build_body(mime_type: MimeType, field_ids: &[&str], vars: &FieldMap) -> String {
    if mime_type == MimeType::TextPlain {
        return build_text_body(field_ids, vars);
    }

    let mut resolved = FieldMap::new();
    for field in field_ids {
        if let Some(value) = fields::get_path(vars, field) {
            if !value.is_null() {
                resolved.insert((*field).to_string(), value.clone());
            }
        }
    }
    let flat = resolved.clone();
    let mut nested = fields::unflatten(resolved).unwrap_or(flat);
    if !nested.contains_key("price") {
        nested.insert("price".to_string(), Value::from(0));
    }

    if mime_type.is_xml() {
        xml::serialize("result", &Value::Object(nested), true)
    } else {
        serde_json::to_string(&Value::Object(nested)).unwrap_or_default()
    }
}

/// The plain-text rendition only ever carries the four well-known fields.
fn build_text_body(field_ids: &[&str], vars: &FieldMap) -> String {
    let mut body = String::new();
    let lookup = |path: &str| {
        fields::get_path(vars, path)
            .filter(|v| !v.is_null())
            .map(fields::scalar_to_string)
    };
    if field_ids.contains(&"lead.id") {
        if let Some(id) = lookup("lead.id") {
            body.push_str(&format!("lead_id:{id}\n"));
        }
    }
    if field_ids.contains(&"outcome") {
        if let Some(outcome) = lookup("outcome") {
            body.push_str(&format!("outcome:{outcome}\n"));
        }
    }
    if field_ids.contains(&"reason") {
        if let Some(reason) = lookup("reason") {
            body.push_str(&format!("reason:{reason}\n"));
        }
    }
    if field_ids.contains(&"price") {
        let price = lookup("price").unwrap_or_else(|| "0".to_string());
        body.push_str(&format!("price:{price}\n"));
    }
    body
}

fn has_positive_price(vars: &FieldMap) -> bool {
    match vars.get("price") {
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f > 0.0),
        Some(Value::String(s)) => s.parse::<f64>().is_ok_and(|f| f > 0.0),
        _ => false,
    }
}

fn is_set(value: Option<&Value>) -> bool {
    matches!(value, Some(v) if !v.is_null())
}
