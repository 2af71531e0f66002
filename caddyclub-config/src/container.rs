//! Virtual container recognition
//!
//! A virtual container is one wildcard site block that hosts several services,
//! each written as a host matcher plus a handle block for it:
//!
//! ```text
//! *.services.example.com {
//!     @api host api.services.example.com
//!     handle @api {
//!         reverse_proxy localhost:8080
//!     }
//! }
//! ```
//!
//! Recognition works either on raw text (which also picks up a comment line
//! just above a handle block as its description) or on a parsed site block.
//! Handle blocks whose matcher is missing or defined twice are not services;
//! they stay in the shared directives.

use crate::ids::{IdGenerator, SequentialIds};
use crate::parser::ast::{Directive, SiteBlock};
use crate::parser::lexer::{is_block_close, is_block_open, tokenize_line, unquote};
use crate::parser::parse_directives;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SITE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([*a-z0-9.-]+)\s*\{").expect("valid site regex"));
static HOST_MATCHER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([A-Za-z0-9_-]+)\s+host\s+(\S+)").expect("valid matcher regex"));
static HANDLE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^handle\s+@([A-Za-z0-9_-]+)\s*\{").expect("valid handle regex"));

/// UI view of a wildcard site block split into services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualContainer {
    pub wildcard_domain: String,

    /// Directives outside the recognized services
    pub shared_config: Vec<Directive>,

    pub virtual_blocks: Vec<VirtualBlock>,
}

/// One service inside a virtual container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualBlock {
    pub matcher_name: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub directives: Vec<Directive>,
}

impl VirtualBlock {
    /// Top-level directive lines of the service
    pub fn directive_lines(&self) -> Vec<String> {
        self.directives.iter().map(Directive::line).collect()
    }
}

impl VirtualContainer {
    pub fn service(&self, matcher_name: &str) -> Option<&VirtualBlock> {
        self.virtual_blocks
            .iter()
            .find(|b| b.matcher_name == matcher_name)
    }

    /// Turn the view back into a site block: shared directives first, then a
    /// matcher and handle block per service. Descriptions are not kept.
    pub fn to_site_block(&self, ids: &mut dyn IdGenerator) -> SiteBlock {
        let mut directives = self.shared_config.clone();
        for block in &self.virtual_blocks {
            let token = format!("@{}", block.matcher_name);
            directives.push(
                Directive::new(ids.next_id(), token.as_str()).with_args(["host", block.hostname.as_str()]),
            );
            directives.push(
                Directive::new(ids.next_id(), "handle")
                    .with_args([token])
                    .with_block(block.directives.clone()),
            );
        }
        SiteBlock::new(ids.next_id(), [self.wildcard_domain.as_str()]).with_directives(directives)
    }
}

/// Remove a service's handle block and its host matcher from a site block
pub fn remove_virtual_service(site: &SiteBlock, matcher_name: &str) -> SiteBlock {
    let token = format!("@{}", matcher_name);
    let mut pruned = site.clone();
    pruned.directives.retain(|d| {
        let is_matcher = d.name == token && d.first_arg() == Some("host");
        let is_handle = d.name == "handle" && d.first_arg() == Some(token.as_str());
        !is_matcher && !is_handle
    });
    pruned
}

/// `@name host <hostname>` as (name, hostname)
fn host_matcher(directive: &Directive) -> Option<(&str, String)> {
    let name = directive.name.strip_prefix('@')?;
    match directive.args.as_slice() {
        [kind, hostname, ..] if kind == "host" => Some((name, unquote(hostname))),
        _ => None,
    }
}

/// Matcher name of a `handle @name { ... }` directive
fn handle_matcher(directive: &Directive) -> Option<&str> {
    if directive.name != "handle" || directive.block.is_none() {
        return None;
    }
    directive.first_arg()?.strip_prefix('@')
}

/// Recognize a virtual container in an already parsed site block
pub fn virtual_container_from_site_block(site: &SiteBlock) -> Option<VirtualContainer> {
    let mut hosts: IndexMap<&str, Vec<String>> = IndexMap::new();
    for (name, hostname) in site.directives.iter().filter_map(host_matcher) {
        hosts.entry(name).or_default().push(hostname);
    }

    let mut virtual_blocks = Vec::new();
    let mut paired = Vec::new();
    for directive in &site.directives {
        let Some(name) = handle_matcher(directive) else {
            continue;
        };
        match hosts.get(name).map(Vec::as_slice) {
            Some([hostname]) => {
                paired.push(name.to_string());
                virtual_blocks.push(VirtualBlock {
                    matcher_name: name.to_string(),
                    hostname: hostname.clone(),
                    description: None,
                    directives: directive.children().to_vec(),
                });
            }
            _ => tracing::debug!("handle @{} has no unique host matcher; not a service", name),
        }
    }

    if virtual_blocks.is_empty() {
        return None;
    }

    let is_paired = |name: Option<&str>| name.is_some_and(|n| paired.iter().any(|p| p == n));
    let shared_config = site
        .directives
        .iter()
        .filter(|d| !is_paired(handle_matcher(d)) && !is_paired(host_matcher(d).map(|(n, _)| n)))
        .cloned()
        .collect();

    Some(VirtualContainer {
        wildcard_domain: site.addresses.first().cloned().unwrap_or_default(),
        shared_config,
        virtual_blocks,
    })
}

/// Standalone `{` and `}` tokens on a line
fn brace_counts(line: &str) -> (usize, usize) {
    tokenize_line(line)
        .iter()
        .fold((0, 0), |(open, close), token| {
            if is_block_open(token) {
                (open + 1, close)
            } else if is_block_close(token) {
                (open, close + 1)
            } else {
                (open, close)
            }
        })
}

/// Line text without the one `}` token that closes the enclosing handle
fn before_close(line: &str) -> String {
    let mut tokens = tokenize_line(line);
    if tokens.last().is_some_and(|t| is_block_close(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

fn is_section_header(comment: &str) -> bool {
    const RULES: [&str; 4] = ["==", "--", "##", "**"];
    comment.is_empty()
        || RULES
            .iter()
            .any(|r| comment.starts_with(r) || comment.ends_with(r))
}

struct PendingHandle<'t> {
    matcher: String,
    start_depth: usize,
    header: &'t str,
    description: Option<String>,
    lines: Vec<String>,
}

enum Item<'t> {
    Line(&'t str),
    Matcher(&'t str, String),
    Handle(PendingHandle<'t>),
}

/// Recognize a virtual container in Caddyfile text with deterministic ids
pub fn detect_virtual_container(text: &str) -> Option<VirtualContainer> {
    let mut ids = SequentialIds::new("v");
    detect_virtual_container_with_ids(text, &mut ids)
}

/// Recognize a virtual container in the first matching site block of `text`
pub fn detect_virtual_container_with_ids(
    text: &str,
    ids: &mut dyn IdGenerator,
) -> Option<VirtualContainer> {
    let mut domain: Option<String> = None;
    let mut depth = 0usize;
    let mut hosts: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut items: Vec<Item> = Vec::new();
    let mut current: Option<PendingHandle> = None;
    let mut last_comment: Option<String> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (opens, closes) = brace_counts(trimmed);
        let before = depth;
        depth = (depth + opens).saturating_sub(closes);

        if domain.is_none() {
            if before == 0 {
                if let Some(caps) = SITE_LINE.captures(trimmed) {
                    domain = Some(caps[1].to_string());
                }
            }
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            let comment = comment.trim();
            last_comment = (!is_section_header(comment)).then(|| comment.to_string());
            continue;
        }
        let description = last_comment.take();

        if let Some(handle) = current.as_mut() {
            if depth > handle.start_depth {
                handle.lines.push(trimmed.to_string());
                continue;
            }
            let rest = before_close(trimmed);
            if !rest.is_empty() {
                handle.lines.push(rest);
            }
            items.extend(current.take().map(Item::Handle));
            if depth == 0 {
                break;
            }
            continue;
        }

        if before == 1 {
            if let Some(caps) = HANDLE_LINE.captures(trimmed) {
                let mut handle = PendingHandle {
                    matcher: caps[1].to_string(),
                    start_depth: before,
                    header: trimmed,
                    description,
                    lines: Vec::new(),
                };
                if depth <= before {
                    // One-line form: handle @name { directive }
                    let inner = before_close(&trimmed[caps.get(0).map_or(0, |m| m.end())..]);
                    if !inner.is_empty() {
                        handle.lines.push(inner);
                    }
                    items.push(Item::Handle(handle));
                } else {
                    current = Some(handle);
                }
                continue;
            }

            if let Some(caps) = HOST_MATCHER_LINE.captures(trimmed) {
                let name = caps[1].to_string();
                hosts.entry(name.clone()).or_default().push(unquote(&caps[2]));
                items.push(Item::Matcher(trimmed, name));
                continue;
            }
        }

        if depth == 0 {
            // Site block closed
            break;
        }
        items.push(Item::Line(trimmed));
    }

    if let Some(unterminated) = current.take() {
        items.push(Item::Handle(unterminated));
    }

    let wildcard_domain = domain?;
    let unique_host = |name: &str| match hosts.get(name).map(Vec::as_slice) {
        Some([hostname]) => Some(hostname.clone()),
        _ => None,
    };

    let services: Vec<&str> = items
        .iter()
        .filter_map(|item| match item {
            Item::Handle(handle) if unique_host(&handle.matcher).is_some() => {
                Some(handle.matcher.as_str())
            }
            _ => None,
        })
        .collect();
    if services.is_empty() {
        return None;
    }

    let mut shared_lines: Vec<&str> = Vec::new();
    let mut virtual_blocks = Vec::new();
    for item in &items {
        match item {
            Item::Handle(handle) => match unique_host(&handle.matcher) {
                Some(hostname) => virtual_blocks.push(VirtualBlock {
                    matcher_name: handle.matcher.clone(),
                    hostname,
                    description: handle.description.clone(),
                    directives: parse_directives(handle.lines.iter().map(String::as_str), ids),
                }),
                None => {
                    shared_lines.push(handle.header);
                    shared_lines.extend(handle.lines.iter().map(String::as_str));
                    shared_lines.push("}");
                }
            },
            // Paired matchers belong to their service, wherever they appear
            Item::Matcher(line, name) => {
                if !services.contains(&name.as_str()) {
                    shared_lines.push(*line);
                }
            }
            Item::Line(line) => shared_lines.push(*line),
        }
    }

    Some(VirtualContainer {
        wildcard_domain,
        shared_config: parse_directives(shared_lines, ids),
        virtual_blocks,
    })
}

/// Block statistics shown when no virtual container is detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStats {
    /// Site blocks, at least 1
    pub site_blocks: usize,
    /// Directive lines directly inside a top-level block
    pub directives: usize,
}

/// Count top-level blocks and their directive lines
pub fn count_blocks(text: &str) -> BlockStats {
    let mut depth = 0usize;
    let mut site_blocks = 0;
    let mut directives = 0;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (opens, closes) = brace_counts(trimmed);
        let brace_only = trimmed == "{" || trimmed == "}";

        if depth == 0 && opens > 0 && !brace_only {
            site_blocks += 1;
        } else if depth == 1 && !brace_only {
            directives += 1;
        }
        depth = (depth + opens).saturating_sub(closes);
    }

    BlockStats {
        site_blocks: site_blocks.max(1),
        directives,
    }
}
