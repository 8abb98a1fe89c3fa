//! Response classification.
//!
//! Servers answer in several shapes, sometimes for the same endpoint across
//! versions:
//!
//! - `{"d": <payload>}` (ASP.NET style wrapper)
//! - a bare JSON array or scalar
//! - a JSON object carrying `Code` and `Message` (structured fault)
//! - legacy XML with `<string>`/`<boolean>` elements
//!
//! [`Payload::parse`] folds all of them into one enum so callers only deal
//! with the payload they expect.

use serde_json::{Map, Value};

/// Structured fault reported by a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

impl Fault {
    fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let code = map.get("Code")?;
        let message = map.get("Message")?;
        Some(Self {
            code: value_to_string(code),
            message: value_to_string(message),
        })
    }
}

/// Why a body could not be turned into a [`Payload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Server reported an error
    Fault(Fault),
    /// Body looked like JSON but did not parse
    Malformed(String),
}

/// A classified response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Object(Map<String, Value>),
    Array(Vec<Value>),
    Scalar(Value),
    Xml(Vec<String>),
}

impl Payload {
    /// Classify a raw response body.
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        let text = String::from_utf8_lossy(body);
        let text = text.trim_start_matches('\u{feff}').trim();

        if text.is_empty() {
            return Ok(Payload::Scalar(Value::Null));
        }
        if text.starts_with('<') {
            return Ok(Payload::Xml(xml_text_elements(text)));
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(value),
            Err(e) if text.starts_with('{') || text.starts_with('[') => {
                Err(PayloadError::Malformed(e.to_string()))
            }
            // Some endpoints answer with an unquoted plain-text scalar
            Err(_) => Ok(Payload::Scalar(Value::String(text.to_string()))),
        }
    }

    /// Classify an already parsed JSON value, unwrapping `d` and detecting faults.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(mut map) => {
                if let Some(fault) = Fault::from_map(&map) {
                    return Err(PayloadError::Fault(fault));
                }
                match map.remove("d") {
                    Some(inner) => Self::from_value(inner),
                    None => Ok(Payload::Object(map)),
                }
            }
            Value::Array(items) => Ok(Payload::Array(items)),
            other => Ok(Payload::Scalar(other)),
        }
    }

    /// Interpret the payload as a list of strings.
    ///
    /// An empty body counts as an empty list.
    pub fn into_strings(self) -> Option<Vec<String>> {
        match self {
            Payload::Array(items) => Some(items.iter().map(value_to_string).collect()),
            Payload::Xml(values) => Some(values),
            Payload::Scalar(Value::Null) => Some(Vec::new()),
            _ => None,
        }
    }

    /// Interpret the payload as a single string.
    pub fn into_string(self) -> Option<String> {
        match self {
            Payload::Scalar(Value::Null) => None,
            Payload::Scalar(value) => Some(value_to_string(&value)),
            Payload::Xml(values) => values.into_iter().next(),
            _ => None,
        }
    }

    /// Interpret the payload as a boolean (`true`/`false` in any case).
    pub fn into_bool(self) -> Option<bool> {
        match self {
            Payload::Scalar(Value::Bool(b)) => Some(b),
            other => match other.into_string()?.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    /// Interpret the payload as an object.
    pub fn into_object(self) -> Option<Map<String, Value>> {
        match self {
            Payload::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Interpret the payload as an array.
    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Payload::Array(items) => Some(items),
            Payload::Scalar(Value::Null) => Some(Vec::new()),
            _ => None,
        }
    }

    /// Short shape name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Object(_) => "object",
            Payload::Array(_) => "array",
            Payload::Scalar(_) => "scalar",
            Payload::Xml(_) => "xml",
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract the text of every leaf element in a legacy XML answer.
///
/// `<ArrayOfString><string>a</string><string>b</string></ArrayOfString>`
/// yields `["a", "b"]`. Declarations, comments, self-closing and empty
/// elements are skipped.
pub fn xml_text_elements(xml: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut pos = 0;

    while let Some(open_rel) = xml[pos..].find('<') {
        let open = pos + open_rel;
        let Some(close_rel) = xml[open..].find('>') else {
            break;
        };
        let close = open + close_rel;
        let tag = &xml[open + 1..close];
        pos = close + 1;

        if tag.starts_with('/') || tag.starts_with('?') || tag.starts_with('!') || tag.ends_with('/')
        {
            continue;
        }

        let Some(next_rel) = xml[pos..].find('<') else {
            break;
        };
        let next = pos + next_rel;
        let text = xml[pos..next].trim();
        if xml[next..].starts_with("</") && !text.is_empty() {
            values.push(unescape(text));
        }
    }

    values
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
