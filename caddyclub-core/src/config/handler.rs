//! Route handler model
//!
//! A closed set of handler shapes the converter understands, plus an opaque
//! variant that keeps any other handler object intact.

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::ser::{SerializeMap, Serializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One entry of a route's `handle` list, tagged by its `handler` field
#[derive(Debug, Clone, PartialEq)]
pub enum Handler {
    ReverseProxy(ReverseProxyHandler),
    FileServer(FileServerHandler),
    StaticResponse(StaticResponseHandler),
    Encode(EncodeHandler),
    Headers(HeadersHandler),
    /// Any other handler, or a known tag whose payload does not fit its typed shape
    Opaque(OpaqueHandler),
}

impl Handler {
    /// The `handler` tag written to JSON
    pub fn name(&self) -> &str {
        match self {
            Handler::ReverseProxy(_) => "reverse_proxy",
            Handler::FileServer(_) => "file_server",
            Handler::StaticResponse(_) => "static_response",
            Handler::Encode(_) => "encode",
            Handler::Headers(_) => "headers",
            Handler::Opaque(h) => &h.handler,
        }
    }

    /// Build a handler from its tag and remaining fields
    pub fn from_parts(tag: String, fields: Map<String, Value>) -> Self {
        fn typed<T: DeserializeOwned>(fields: &Map<String, Value>) -> Option<T> {
            serde_json::from_value(Value::Object(fields.clone())).ok()
        }

        let known = match tag.as_str() {
            "reverse_proxy" => typed(&fields).map(Handler::ReverseProxy),
            "file_server" => typed(&fields).map(Handler::FileServer),
            "static_response" => typed(&fields).map(Handler::StaticResponse),
            "encode" => typed(&fields).map(Handler::Encode),
            "headers" => typed(&fields).map(Handler::Headers),
            _ => None,
        };

        known.unwrap_or(Handler::Opaque(OpaqueHandler {
            handler: tag,
            fields,
        }))
    }

    /// Names of fields kept verbatim because no typed field covers them,
    /// nested ones as `parent.field`
    pub fn unmapped_fields(&self) -> Vec<String> {
        fn keys(map: &Map<String, Value>) -> impl Iterator<Item = String> + '_ {
            map.keys().cloned()
        }

        match self {
            Handler::ReverseProxy(h) => keys(&h.extra).collect(),
            Handler::FileServer(h) => keys(&h.extra).collect(),
            Handler::StaticResponse(h) => keys(&h.extra).collect(),
            Handler::Encode(h) => keys(&h.extra).collect(),
            Handler::Headers(h) => {
                let nested = h
                    .response
                    .iter()
                    .flat_map(|r| r.extra.keys().map(|k| format!("response.{}", k)));
                keys(&h.extra).chain(nested).collect()
            }
            Handler::Opaque(_) => Vec::new(),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Handler::ReverseProxy(h) => serde_json::to_value(h),
            Handler::FileServer(h) => serde_json::to_value(h),
            Handler::StaticResponse(h) => serde_json::to_value(h),
            Handler::Encode(h) => serde_json::to_value(h),
            Handler::Headers(h) => serde_json::to_value(h),
            Handler::Opaque(h) => Ok(Value::Object(h.fields.clone())),
        }
    }
}

impl Serialize for Handler {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self.payload().map_err(S::Error::custom)?;
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("handler", self.name())?;
        if let Value::Object(fields) = payload {
            for (key, value) in fields.iter().filter(|(k, _)| k.as_str() != "handler") {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Handler {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let tag = match fields.get("handler") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(D::Error::custom(format!(
                    "handler tag must be a string, found {}",
                    other
                )));
            }
            None => return Err(D::Error::missing_field("handler")),
        };
        let rest = fields.into_iter().filter(|(k, _)| k != "handler").collect();
        Ok(Handler::from_parts(tag, rest))
    }
}

/// `reverse_proxy` handler
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReverseProxyHandler {
    #[serde(default)]
    pub upstreams: Vec<Upstream>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Backend dial address
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Upstream {
    pub dial: String,
}

impl Upstream {
    pub fn new(dial: impl Into<String>) -> Self {
        Self { dial: dial.into() }
    }
}

/// URI rewrite applied before proxying
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rewrite {
    pub uri: String,
}

/// `file_server` handler
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileServerHandler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse: Option<Browse>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Directory browsing options; an empty object enables browsing with defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Browse {
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// `static_response` handler, used for both `respond` and `redir`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StaticResponseHandler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<StatusCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<IndexMap<String, Vec<String>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StaticResponseHandler {
    /// First `Location` header value, if any
    pub fn location(&self) -> Option<&str> {
        self.headers
            .as_ref()?
            .get("Location")?
            .first()
            .map(String::as_str)
    }
}

/// Status code: numeric, or a placeholder string such as `{http.error.status_code}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatusCode {
    Code(u16),
    Placeholder(String),
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCode::Code(code) => write!(f, "{}", code),
            StatusCode::Placeholder(s) => write!(f, "{}", s),
        }
    }
}

/// `encode` handler
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EncodeHandler {
    /// Encoding names. Accepts either a list or an object keyed by encoding.
    #[serde(default, deserialize_with = "encodings_from_list_or_map")]
    pub encodings: Vec<String>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn encodings_from_list_or_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!("invalid encoding: {}", other))),
            })
            .collect(),
        Value::Object(map) => Ok(map.keys().cloned().collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(D::Error::custom(format!("invalid encodings: {}", other))),
    }
}

/// `headers` handler
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HeadersHandler {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseHeaderOps>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response header operations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResponseHeaderOps {
    #[serde(default)]
    pub set: IndexMap<String, Vec<String>>,

    /// Fields this model does not cover, kept as they came
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handler the converter has no typed model for
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueHandler {
    pub handler: String,
    pub fields: Map<String, Value>,
}
