//! Static self-description: the parameter and variable listings surfaced in
//! the host UI, plus canned example submissions for each supported encoding.

use http::{HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::api::Request;
use crate::fields::{scalar_to_string, FieldMap};
use crate::mime::MimeType;
use crate::xml;

#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

fn variable(name: &'static str, kind: &'static str, description: &'static str) -> VariableSpec {
    VariableSpec {
        name,
        kind,
        description: Some(description),
        required: None,
    }
}

/// Parameters a poster may supply on any submission.
pub fn request_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec {
            name: "*",
            kind: "wildcard",
            label: None,
            description: None,
            required: None,
            examples: vec![],
        },
        ParamSpec {
            name: "redir_url",
            kind: "url",
            label: Some("Redirect URL"),
            description: Some("Redirect to this URL after submission"),
            required: Some(false),
            examples: vec!["http://myserver.com/thankyou.html"],
        },
    ]
}

/// Variables an inbound submission can set.
pub fn request_variables() -> Vec<VariableSpec> {
    vec![
        variable(
            "trustedform_cert_url",
            "string",
            "URL to the TrustedForm Certificate",
        ),
        VariableSpec {
            name: "*",
            kind: "wildcard",
            description: None,
            required: None,
        },
    ]
}

/// Variables the response builder reads, which differ for pings.
pub fn response_variables(for_ping: bool) -> Vec<VariableSpec> {
    if for_ping {
        vec![
            variable("outcome", "string", "The outcome of the ping (default is success)"),
            variable("reason", "string", "If the ping outcome was a failure, this is the reason"),
            variable("price", "number", "The bid price of the lead"),
        ]
    } else {
        vec![
            variable("lead.id", "string", "The lead identifier that the source should reference"),
            variable("outcome", "string", "The outcome of the transaction (default is success)"),
            variable("reason", "string", "If the outcome was a failure, this is the reason"),
            variable("price", "number", "The price of the lead"),
        ]
    }
}

/// Variables the outbound delivery reads.
pub fn delivery_variables() -> Vec<VariableSpec> {
    vec![
        VariableSpec {
            name: "url",
            kind: "string",
            description: Some("Server URL"),
            required: Some(true),
        },
        VariableSpec {
            name: "method",
            kind: "string",
            description: Some("HTTP method (GET or POST)"),
            required: Some(true),
        },
        variable(
            "default_outcome",
            "string",
            "Outcome to return if recipient returns none (success, failure, error). If not specified, \"error\" will be used.",
        ),
        VariableSpec {
            name: "lead.*",
            kind: "wildcard",
            description: None,
            required: Some(true),
        },
        VariableSpec {
            name: "custom.*",
            kind: "wildcard",
            description: None,
            required: Some(false),
        },
        variable("price", "number", "The price of the lead"),
    ]
}

/// Variables an outbound delivery's outcome event can set.
pub fn delivery_outcome_variables() -> Vec<VariableSpec> {
    vec![
        variable("outcome", "string", "The outcome of the transaction (default is success)"),
        variable("reason", "string", "If the outcome was a failure, this is the reason"),
        variable("price", "number", "The price of the lead"),
    ]
}

/// Builds the five standard sample submissions shown to integrators: form
/// POST, GET, JSON POST, XML POST, and a form POST asking for XML back.
///
/// A `redir_url` parameter moves into the query string for POST examples, as
/// redirects are negotiated there rather than in the body.
pub fn example_requests(flow_id: &str, source_id: &str, params: &FieldMap) -> Vec<Request> {
    let base_uri = format!("/flows/{flow_id}/sources/{source_id}/submit");

    let get_uri = if params.is_empty() {
        base_uri.clone()
    } else {
        format!("{base_uri}?{}", encode_params(params))
    };

    let mut body_params = params.clone();
    let post_uri = match body_params.remove("redir_url") {
        Some(redir) => {
            let encoded: String =
                form_urlencoded::byte_serialize(scalar_to_string(&redir).as_bytes()).collect();
            format!("{base_uri}?redir_url={encoded}")
        }
        None => base_uri.clone(),
    };

    let form_body = encode_params(&body_params);
    let json_body = serde_json::to_string_pretty(&Value::Object(body_params.clone()))
        .unwrap_or_default();
    let xml_body = xml::serialize("lead", &Value::Object(body_params), true);

    vec![
        example(Method::POST, &post_uri, MimeType::Json, Some(MimeType::UrlEncoded), Some(form_body.clone())),
        example(Method::GET, &get_uri, MimeType::Json, None, None),
        example(Method::POST, &post_uri, MimeType::Json, Some(MimeType::Json), Some(json_body)),
        example(Method::POST, &post_uri, MimeType::XmlText, Some(MimeType::XmlText), Some(xml_body)),
        example(Method::POST, &post_uri, MimeType::XmlText, Some(MimeType::UrlEncoded), Some(form_body)),
    ]
}

fn encode_params(params: &FieldMap) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        serializer.append_pair(key, &scalar_to_string(value));
    }
    serializer.finish()
}

fn example(
    method: Method,
    uri: &str,
    accept: MimeType,
    content_type: Option<MimeType>,
    body: Option<String>,
) -> Request {
    let mut req = Request::new(method, uri);
    req.headers
        .insert(http::header::ACCEPT, HeaderValue::from_static(accept.as_str()));
    if let Some(content_type) = content_type {
        req.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
    }
    req.body = body;
    req
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> FieldMap {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn params_include_wildcard() {
        assert!(request_params().iter().any(|p| p.name == "*"));
    }

    #[test]
    fn examples_share_the_submit_uri() {
        for req in example_requests("123", "345", &FieldMap::new()) {
            assert_eq!(req.uri, "/flows/123/sources/345/submit");
            assert!(req.method == Method::GET || req.method == Method::POST);
            assert!(req.headers.contains_key("accept"));
        }
    }

    #[test]
    fn redir_url_moves_into_the_query_string() {
        let examples = example_requests(
            "123",
            "345",
            &params(json!({"redir_url": "http://foo.com?bar=baz"})),
        );
        for req in examples.iter().filter(|r| r.method == Method::POST) {
            assert_eq!(
                req.uri,
                "/flows/123/sources/345/submit?redir_url=http%3A%2F%2Ffoo.com%3Fbar%3Dbaz"
            );
        }
        let form = examples
            .iter()
            .find(|r| r.header("content-type") == Some("application/x-www-form-urlencoded"))
            .unwrap();
        assert_eq!(form.body.as_deref(), Some(""));
    }

    #[test]
    fn form_examples_encode_pairs() {
        let examples = example_requests(
            "123",
            "345",
            &params(json!({"first_name": "alex", "email": "alex@test.com"})),
        );
        let form: Vec<_> = examples
            .iter()
            .filter(|r| r.header("content-type") == Some("application/x-www-form-urlencoded"))
            .collect();
        assert_eq!(form.len(), 2);
        for req in form {
            assert_eq!(req.body.as_deref(), Some("first_name=alex&email=alex%40test.com"));
        }
    }

    #[test]
    fn xml_example_is_pretty_printed() {
        let examples = example_requests(
            "123",
            "345",
            &params(json!({"first_name": "alex", "email": "alex@test.com"})),
        );
        let xml_example = examples
            .iter()
            .find(|r| r.header("content-type") == Some("text/xml"))
            .unwrap();
        assert_eq!(
            xml_example.body.as_deref(),
            Some("<?xml version=\"1.0\"?>\n<lead>\n  <first_name>alex</first_name>\n  <email>alex@test.com</email>\n</lead>")
        );
    }

    #[test]
    fn json_example_is_pretty_printed() {
        let examples = example_requests(
            "123",
            "345",
            &params(json!({"first_name": "alex"})),
        );
        let json_example = examples
            .iter()
            .find(|r| r.header("content-type") == Some("application/json"))
            .unwrap();
        assert_eq!(json_example.body.as_deref(), Some("{\n  \"first_name\": \"alex\"\n}"));
    }
}
