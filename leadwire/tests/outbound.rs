use assert_json_diff::assert_json_eq;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use leadwire::outbound::{build_request, parse_response, validate, ACCEPT_HEADER};
use leadwire::{OutboundVars, Response};
use serde_json::{json, Value};

fn base_vars() -> OutboundVars {
    OutboundVars {
        url: Some("http://externalservice".to_string()),
        method: None,
        default_outcome: None,
        lead: json!({
            "first_name": "Joe",
            "last_name": "Blow",
            "email": "jblow@test.com",
            "phone_1": "5127891111"
        }),
        custom: None,
        price: Some(1.5),
    }
}

fn get_vars() -> OutboundVars {
    OutboundVars {
        method: Some("get".to_string()),
        ..base_vars()
    }
}

fn json_response(body: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    Response {
        status: StatusCode::OK,
        headers,
        body: body.to_string(),
    }
}

fn xml_response(body: &str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/xml"));
    Response {
        status: StatusCode::OK,
        headers,
        body: body.to_string(),
    }
}

// Request building ----------------------------------------------------------

#[test]
fn sends_the_accept_header() {
    let req = build_request(&base_vars()).unwrap();
    assert_eq!(
        req.headers.get("accept").and_then(|v| v.to_str().ok()),
        Some("application/json;q=0.9,text/xml;q=0.8,application/xml;q=0.7")
    );
    assert_eq!(
        ACCEPT_HEADER,
        "application/json;q=0.9,text/xml;q=0.8,application/xml;q=0.7"
    );
}

#[test]
fn get_encodes_fields_in_the_query_string() {
    let req = build_request(&get_vars()).unwrap();
    assert_eq!(req.method, Method::GET);
    assert_eq!(req.body, None);
    assert_eq!(
        req.url,
        "http://externalservice/?first_name=Joe&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5"
    );
}

#[test]
fn get_merges_fields_over_existing_query_parameters() {
    let vars = OutboundVars {
        url: Some("http://externalservice?first_name=Bobby&aff_id=123".to_string()),
        ..get_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.url,
        "http://externalservice/?first_name=Joe&aff_id=123&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5"
    );
}

#[test]
fn get_collapses_duplicate_query_keys_on_override() {
    let vars = OutboundVars {
        url: Some("http://externalservice?first_name=Bobby&first_name=Sue&aff_id=123".to_string()),
        ..get_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.url,
        "http://externalservice/?first_name=Joe&aff_id=123&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5"
    );
}

#[test]
fn null_fields_send_as_empty_values() {
    let vars = OutboundVars {
        lead: json!({
            "first_name": null,
            "last_name": "Blow",
            "email": "jblow@test.com",
            "phone_1": "5127891111"
        }),
        ..get_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.url,
        "http://externalservice/?first_name=&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5"
    );
}

#[test]
fn absent_fields_are_omitted() {
    let vars = OutboundVars {
        lead: json!({
            "last_name": "Blow",
            "email": "jblow@test.com",
            "phone_1": "5127891111"
        }),
        ..get_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.url,
        "http://externalservice/?last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5"
    );
}

#[test]
fn post_encodes_fields_as_a_form_body() {
    let req = build_request(&base_vars()).unwrap();
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.url, "http://externalservice");
    assert_eq!(
        req.body.as_deref(),
        Some("first_name=Joe&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5")
    );
}

#[test]
fn post_sets_content_length() {
    let req = build_request(&base_vars()).unwrap();
    assert_eq!(
        req.headers.get("content-length").and_then(|v| v.to_str().ok()),
        Some("81")
    );
}

#[test]
fn post_sets_content_type() {
    let req = build_request(&base_vars()).unwrap();
    assert_eq!(
        req.headers.get("content-type").and_then(|v| v.to_str().ok()),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn dotted_field_names_stay_literal() {
    let vars = OutboundVars {
        url: Some("http://externalservice".to_string()),
        method: Some("get".to_string()),
        lead: json!({"deeply.nested.var": "Hola"}),
        ..Default::default()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(req.url, "http://externalservice/?deeply.nested.var=Hola&price=0");
}

#[test]
fn nested_fields_flatten_to_dotted_names() {
    let vars = OutboundVars {
        url: Some("http://externalservice".to_string()),
        method: Some("get".to_string()),
        lead: json!({"deeply": {"nested": {"var": "Hola"}}}),
        ..Default::default()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(req.url, "http://externalservice/?deeply.nested.var=Hola&price=0");
}

#[test]
fn custom_fields_are_appended() {
    let vars = OutboundVars {
        custom: Some(json!({"favorite_color": "pink"})),
        ..base_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.body.as_deref(),
        Some("first_name=Joe&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&favorite_color=pink&price=1.5")
    );
}

#[test]
fn truthy_custom_fields_override_standard_ones() {
    let vars = OutboundVars {
        custom: Some(json!({"email": "custom@email.com"})),
        ..base_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.body.as_deref(),
        Some("first_name=Joe&last_name=Blow&email=custom%40email.com&phone_1=5127891111&price=1.5")
    );
}

#[test]
fn falsy_custom_fields_do_not_override() {
    let vars = OutboundVars {
        custom: Some(json!({"email": ""})),
        ..base_vars()
    };
    let req = build_request(&vars).unwrap();
    assert_eq!(
        req.body.as_deref(),
        Some("first_name=Joe&last_name=Blow&email=jblow%40test.com&phone_1=5127891111&price=1.5")
    );
}

// Validation ----------------------------------------------------------------

#[test]
fn rejects_unknown_default_outcomes() {
    let vars = OutboundVars {
        default_outcome: Some("donkey".to_string()),
        ..base_vars()
    };
    assert_eq!(
        validate(&vars).as_deref(),
        Some("default outcome must be \"success\", \"failure\" or \"error\"")
    );
}

#[test]
fn accepts_known_default_outcomes() {
    for outcome in ["success", "failure", "error"] {
        let vars = OutboundVars {
            default_outcome: Some(outcome.to_string()),
            ..base_vars()
        };
        assert_eq!(validate(&vars), None);
    }
}

#[test]
fn requires_a_url() {
    let vars = OutboundVars {
        url: None,
        ..base_vars()
    };
    assert_eq!(validate(&vars).as_deref(), Some("URL is required"));
}

#[test]
fn requires_a_valid_url() {
    for bad in ["donkeykong", "ftp://externalservice", "http://"] {
        let vars = OutboundVars {
            url: Some(bad.to_string()),
            ..base_vars()
        };
        assert_eq!(validate(&vars).as_deref(), Some("URL must be valid"), "url: {bad}");
    }
}

#[test]
fn rejects_unsupported_methods() {
    for method in ["head", "put", "delete", "patch"] {
        let vars = OutboundVars {
            method: Some(method.to_string()),
            ..base_vars()
        };
        assert_eq!(
            validate(&vars).as_deref(),
            Some("Unsupported HTTP method - use GET or POST"),
            "method: {method}"
        );
    }
}

#[test]
fn allows_get_and_post_in_any_case() {
    for method in ["get", "GET", "post", "POST"] {
        let vars = OutboundVars {
            method: Some(method.to_string()),
            ..base_vars()
        };
        assert_eq!(validate(&vars), None);
    }
}

// Response parsing ----------------------------------------------------------

#[test]
fn outcome_defaults_to_error() {
    let event = parse_response(&base_vars(), &json_response(r#"{"id":42}"#));
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Unrecognized response"})
    );
}

#[test]
fn outcome_defaults_to_the_configured_default() {
    let vars = OutboundVars {
        default_outcome: Some("success".to_string()),
        ..base_vars()
    };
    let event = parse_response(&vars, &json_response(r#"{"id":42}"#));
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "success", "reason": "Unrecognized response"})
    );
}

#[test]
fn existing_reason_survives_outcome_defaulting() {
    let event = parse_response(
        &base_vars(),
        &json_response(r#"{"id":42,"reason": "Big bada boom"}"#),
    );
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Big bada boom"})
    );
}

#[test]
fn handler_message_becomes_the_reason() {
    let event = parse_response(
        &base_vars(),
        &json_response(r#"{ "message": "Flow is disabled" }"#),
    );
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Flow is disabled"})
    );
}

#[test]
fn parses_json_outcome_events() {
    let body = r#"{"outcome":"success","reason":"","lead":{"id":"1234","last_name":"Blow","email":"jblow@test.com","phone_1":"5127891111"},"price":1.5}"#;
    let event = parse_response(&base_vars(), &json_response(body));
    assert_json_eq!(
        Value::Object(event),
        json!({
            "outcome": "success",
            "reason": "",
            "lead": {
                "id": "1234",
                "last_name": "Blow",
                "email": "jblow@test.com",
                "phone_1": "5127891111"
            },
            "price": 1.5
        })
    );
}

#[test]
fn parses_xml_outcome_events() {
    let body = "<result>\n  <outcome>success</outcome>\n  <reason/>\n  <lead>\n    <id>1234</id>\n    <last_name>Blow</last_name>\n    <email>jblow@test.com</email>\n    <phone_1>5127891111</phone_1>\n  </lead>\n  <price>1.5</price>\n</result>";
    let event = parse_response(&base_vars(), &xml_response(body));
    assert_json_eq!(
        Value::Object(event),
        json!({
            "outcome": "success",
            "reason": "",
            "lead": {
                "id": "1234",
                "last_name": "Blow",
                "email": "jblow@test.com",
                "phone_1": "5127891111"
            },
            "price": "1.5"
        })
    );
}

#[test]
fn poorly_formed_xml_degrades_to_an_error_event() {
    let body = "<status>Error</status><reason>Please send in the mg_site_id as part of your request</reason>";
    let event = parse_response(&base_vars(), &xml_response(body));
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Unrecognized response"})
    );
}

#[test]
fn malformed_json_degrades_to_an_error_event() {
    let event = parse_response(&base_vars(), &json_response("{not json"));
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Unrecognized response"})
    );
}

#[test]
fn missing_content_type_is_an_error_event() {
    let res = Response {
        status: StatusCode::OK,
        headers: HeaderMap::new(),
        body: r#"{"outcome":"success"}"#.to_string(),
    };
    let event = parse_response(&base_vars(), &res);
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "No Content-Type specified in server response"})
    );
}

#[test]
fn unsupported_content_type_is_an_error_event() {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    let res = Response {
        status: StatusCode::OK,
        headers,
        body: "<html></html>".to_string(),
    };
    let event = parse_response(&base_vars(), &res);
    assert_json_eq!(
        Value::Object(event),
        json!({"outcome": "error", "reason": "Unsupported Content-Type specified in server response"})
    );
}
