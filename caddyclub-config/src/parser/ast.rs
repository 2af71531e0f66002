//! Generic AST for Caddyfile syntax
//!
//! This AST represents the structure of a Caddyfile:
//! - Directives (Name + Args + optional nested block)
//! - Site blocks (Addresses + Directives)
//! - An optional global options block

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    /// Identity, unique within the owning tree
    pub id: String,

    /// Directive name (e.g. "reverse_proxy", "@api", "handle")
    pub name: String,

    /// Arguments following the name, quotes retained
    pub args: Vec<String>,

    /// Optional block { ... }
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Vec<Directive>>,

    /// Original source line, trimmed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Directive {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: Vec::new(),
            block: None,
            raw: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_block(mut self, block: Vec<Directive>) -> Self {
        self.block = Some(block);
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// `name args...` on one line, without any block
    pub fn line(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.args.join(" "))
        }
    }

    /// First argument, if any
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Children of the nested block, empty when there is none
    pub fn children(&self) -> &[Directive] {
        self.block.as_deref().unwrap_or(&[])
    }

    /// True if the directive owns a non-empty block
    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteBlock {
    pub id: String,

    /// Site addresses preceding `{`, at least one
    pub addresses: Vec<String>,

    pub directives: Vec<Directive>,

    /// Value of the `@id` pseudo-directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caddy_id: Option<String>,
}

impl SiteBlock {
    pub fn new<I, S>(id: impl Into<String>, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            addresses: addresses.into_iter().map(Into::into).collect(),
            directives: Vec::new(),
            caddy_id: None,
        }
    }

    pub fn with_directives(mut self, directives: Vec<Directive>) -> Self {
        self.directives = directives;
        self
    }

    pub fn with_caddy_id(mut self, caddy_id: impl Into<String>) -> Self {
        self.caddy_id = Some(caddy_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub site_blocks: Vec<SiteBlock>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_options: Option<Vec<Directive>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_line() {
        let d = Directive::new("d-1", "reverse_proxy").with_args(["/api/*", "localhost:8080"]);
        assert_eq!(d.line(), "reverse_proxy /api/* localhost:8080");
        assert_eq!(Directive::new("d-2", "file_server").line(), "file_server");
    }

    #[test]
    fn test_children_of_blockless_directive() {
        let d = Directive::new("d-1", "encode");
        assert!(d.children().is_empty());
        assert!(!d.has_children());
        assert!(!d.clone().with_block(Vec::new()).has_children());
    }

    #[test]
    fn test_camel_case_json() {
        let config = Config {
            site_blocks: vec![SiteBlock::new("s-1", ["a.com"]).with_caddy_id("main")],
            global_options: None,
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["siteBlocks"][0]["caddyId"], "main");
        assert!(json.get("globalOptions").is_none());
    }
}
