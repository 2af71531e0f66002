//! Administrative JSON document types
//!
//! These types mirror the document accepted by the reverse proxy's load/config
//! endpoints. Field names and nesting are part of that contract.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of the administrative JSON document
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AdminConfig {
    #[serde(default)]
    pub apps: Apps,
}

/// App modules
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Apps {
    /// HTTP app
    #[serde(default)]
    pub http: HttpApp,

    /// TLS app, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<Value>,
}

/// HTTP app: named servers in document order
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HttpApp {
    #[serde(default)]
    pub servers: IndexMap<String, HttpServer>,
}

/// One HTTP server
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HttpServer {
    /// Listen addresses
    #[serde(default)]
    pub listen: Vec<String>,

    /// Routes for this server
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// One route: a matcher list plus a handler chain
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Route {
    /// Matcher sets. An empty list matches every request.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub matchers: Option<Vec<MatcherSet>>,

    /// Handler chain
    #[serde(default)]
    pub handle: Vec<crate::config::Handler>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
}

impl Route {
    /// All `host` entries across the route's matcher sets, in order
    pub fn hosts(&self) -> Vec<String> {
        self.matchers
            .iter()
            .flatten()
            .filter_map(|m| m.host.as_ref())
            .flatten()
            .cloned()
            .collect()
    }
}

/// Matcher set
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MatcherSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

impl MatcherSet {
    pub fn hosts(hosts: Vec<String>) -> Self {
        Self {
            host: Some(hosts),
            path: None,
        }
    }
}
