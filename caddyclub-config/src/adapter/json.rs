//! Admin JSON assembler
//!
//! One route per site block, all routes under a single server.

use crate::adapter::directives::{directive_to_handler, handler_to_directive};
use crate::adapter::{report, Diagnostic};
use crate::ids::{IdGenerator, SequentialIds};
use crate::parser::ast::{Config, Directive, SiteBlock};
use crate::parser::parse;
use crate::serializer::serialize;
use caddyclub_core::config::{AdminConfig, ConvertOptions, HttpServer, MatcherSet, Route};
use caddyclub_core::Result;

/// A conversion result together with the issues met on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Converted<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

/// Host-like site addresses, kept verbatim. Port-only addresses and bare
/// `localhost` produce no host matcher.
fn host_matchers(addresses: &[String]) -> Vec<String> {
    addresses
        .iter()
        .filter(|a| !a.starts_with(':') && a.as_str() != "localhost")
        .cloned()
        .collect()
}

/// Build the route for one site block
pub fn site_block_to_route(
    site: &SiteBlock,
    options: &ConvertOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Route {
    let hosts = host_matchers(&site.addresses);
    let matchers = if hosts.is_empty() {
        Vec::new()
    } else {
        vec![MatcherSet::hosts(hosts)]
    };

    let handle = site
        .directives
        .iter()
        .filter_map(|d| directive_to_handler(d, diagnostics))
        .collect();

    Route {
        matchers: Some(matchers),
        handle,
        terminal: options.terminal,
    }
}

/// Assemble the admin document for a whole config
pub fn to_admin_config(config: &Config, options: &ConvertOptions) -> Converted<AdminConfig> {
    let mut diagnostics = Vec::new();

    let routes = config
        .site_blocks
        .iter()
        .map(|site| site_block_to_route(site, options, &mut diagnostics))
        .collect();

    let mut admin = AdminConfig::default();
    admin.apps.http.servers.insert(
        options.server_name.clone(),
        HttpServer {
            listen: options.listen.clone(),
            routes,
        },
    );

    Converted {
        value: admin,
        diagnostics,
    }
}

/// Rebuild a site block from one route
pub fn route_to_site_block(
    route: &Route,
    ids: &mut dyn IdGenerator,
    diagnostics: &mut Vec<Diagnostic>,
) -> SiteBlock {
    let mut addresses = route.hosts();
    if addresses.is_empty() {
        addresses.push("localhost".to_string());
    }

    if route.matchers.iter().flatten().any(|m| m.path.is_some()) {
        report(
            diagnostics,
            Diagnostic::lossy("match", "path matchers are not kept in site addresses"),
        );
    }

    let site_id = ids.next_id();
    let directives: Vec<Directive> = route
        .handle
        .iter()
        .filter_map(|h| handler_to_directive(h, ids, diagnostics))
        .collect();

    SiteBlock::new(site_id, addresses).with_directives(directives)
}

/// Read a config back from the first server of an admin document
pub fn from_admin_config_with_ids(
    admin: &AdminConfig,
    ids: &mut dyn IdGenerator,
) -> Converted<Config> {
    let mut diagnostics = Vec::new();
    let mut config = Config::new();

    let mut servers = admin.apps.http.servers.iter();
    if let Some((name, server)) = servers.next() {
        tracing::debug!("reading {} route(s) from server '{}'", server.routes.len(), name);
        config.site_blocks = server
            .routes
            .iter()
            .map(|route| route_to_site_block(route, ids, &mut diagnostics))
            .collect();
    }

    for (name, _) in servers {
        report(
            &mut diagnostics,
            Diagnostic::lossy(name, format!("server '{}' ignored; only the first server is read", name)),
        );
    }

    Converted {
        value: config,
        diagnostics,
    }
}

/// Read a config back with deterministic ids
pub fn from_admin_config(admin: &AdminConfig) -> Converted<Config> {
    let mut ids = SequentialIds::default();
    from_admin_config_with_ids(admin, &mut ids)
}

/// Caddyfile text to pretty-printed admin JSON
pub fn caddyfile_to_json(text: &str, options: &ConvertOptions) -> Result<String> {
    let converted = to_admin_config(&parse(text), options);
    Ok(serde_json::to_string_pretty(&converted.value)?)
}

/// Admin JSON text to Caddyfile text
pub fn json_to_caddyfile(json: &str) -> Result<String> {
    let admin: AdminConfig = serde_json::from_str(json)?;
    Ok(serialize(&from_admin_config(&admin).value))
}
