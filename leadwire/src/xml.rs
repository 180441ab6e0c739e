//! XML tree codec.
//!
//! Parsing produces the same shape the rest of the crate works with: element
//! attributes merge into the element's map, repeated child elements collect
//! into lists, a text-only element becomes a plain string, and the single
//! document root is stripped. Serialization is the mirror image, with an
//! optional pretty printer for human-facing bodies.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use thiserror::Error;

use crate::fields::{scalar_to_string, FieldMap};

#[derive(Error, Debug)]
pub enum XmlError {
    #[error(transparent)]
    Parse(#[from] quick_xml::Error),
    #[error("non-whitespace content before first tag")]
    ContentBeforeRoot,
    #[error("unexpected content after the document root")]
    TrailingContent,
    #[error("document contains no root element")]
    MissingRoot,
    #[error("unexpected end of document")]
    UnexpectedEof,
}

/// Parses a document and returns the contents of its root element.
pub fn parse(text: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut root: Option<Value> = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                root = Some(parse_element(&mut reader, &start)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(XmlError::TrailingContent);
                }
                root = Some(empty_element(&start));
            }
            Event::Text(text) => {
                if !text.unescape()?.trim().is_empty() {
                    return Err(match root {
                        Some(_) => XmlError::TrailingContent,
                        None => XmlError::ContentBeforeRoot,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    root.ok_or(XmlError::MissingRoot)
}

fn parse_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Value, XmlError> {
    let mut map = attribute_map(start)?;
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Start(child) => {
                let name = element_name(&child);
                let value = parse_element(reader, &child)?;
                insert_child(&mut map, name, value);
            }
            Event::Empty(child) => {
                let name = element_name(&child);
                let value = empty_element(&child);
                insert_child(&mut map, name, value);
            }
            Event::Text(chunk) => text.push_str(&chunk.unescape()?),
            Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
            Event::End(_) => break,
            Event::Eof => return Err(XmlError::UnexpectedEof),
            _ => {}
        }
    }
    if map.is_empty() {
        return Ok(Value::String(text));
    }
    if !text.trim().is_empty() {
        map.insert("_".to_string(), Value::String(text));
    }
    Ok(Value::Object(map))
}

fn empty_element(start: &BytesStart) -> Value {
    match attribute_map(start) {
        Ok(map) if !map.is_empty() => Value::Object(map),
        _ => Value::String(String::new()),
    }
}

fn attribute_map(start: &BytesStart) -> Result<FieldMap, XmlError> {
    let mut map = FieldMap::new();
    for attr in start.attributes().flatten() {
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        map.insert(name, Value::String(value));
    }
    Ok(map)
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn insert_child(map: &mut FieldMap, name: String, value: Value) {
    match map.get_mut(&name) {
        None => {
            map.insert(name, value);
        }
        Some(Value::Array(existing)) => existing.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}

/// Serializes a value tree under the given root element.
pub fn serialize(root: &str, value: &Value, pretty: bool) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>");
    write_node(&mut out, root, value, 0, pretty);
    out
}

fn write_node(out: &mut String, name: &str, value: &Value, depth: usize, pretty: bool) {
    if let Value::Array(items) = value {
        for item in items {
            write_node(out, name, item, depth, pretty);
        }
        return;
    }
    if pretty {
        out.push('\n');
        for _ in 0..depth {
            out.push_str("  ");
        }
    }
    match value {
        Value::Object(map) if !map.is_empty() => {
            out.push('<');
            out.push_str(name);
            out.push('>');
            for (child, value) in map {
                write_node(out, child, value, depth + 1, pretty);
            }
            if pretty {
                out.push('\n');
                for _ in 0..depth {
                    out.push_str("  ");
                }
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        other => {
            let text = scalar_to_string(other);
            if text.is_empty() {
                out.push('<');
                out.push_str(name);
                out.push_str("/>");
            } else {
                out.push('<');
                out.push_str(name);
                out.push('>');
                out.push_str(&escape(&text));
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}
