//! Caddyclub Caddyfile toolkit
//!
//! This crate parses the Caddyfile DSL into an editable tree, prints it back,
//! and converts it to and from the web server's administrative JSON.
//!
//! # Example
//!
//! ```rust
//! use caddyclub_config::{caddyfile_to_json, parse, serialize};
//! use caddyclub_core::config::ConvertOptions;
//!
//! let source = "app.example.com {\n\treverse_proxy localhost:3000\n}\n";
//!
//! let config = parse(source);
//! assert_eq!(serialize(&config), source);
//!
//! let json = caddyfile_to_json(source, &ConvertOptions::default()).unwrap();
//! assert!(json.contains("\"dial\": \"localhost:3000\""));
//! ```

pub mod adapter;
pub mod container;
pub mod ids;
pub mod parser;
pub mod serializer;
pub mod tree;
pub mod validator;

pub use adapter::{
    caddyfile_to_json, from_admin_config, json_to_caddyfile, to_admin_config, Converted,
    Diagnostic, DiagnosticKind,
};
pub use container::{
    count_blocks, detect_virtual_container, remove_virtual_service,
    virtual_container_from_site_block, BlockStats, VirtualBlock, VirtualContainer,
};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use parser::{parse, parse_directives, parse_with_ids, Config, Directive, SiteBlock};
pub use serializer::{serialize, serialize_directives, serialize_site_block};
pub use tree::{delete_directive, find_directive, retain_directives, update_directive};
pub use validator::{ensure_valid, validate, ValidationReport};

use std::path::Path;

/// Validate then parse text from an untrusted source
pub fn parse_untrusted(text: &str) -> caddyclub_core::Result<Config> {
    let report = ensure_valid(text)?;
    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    Ok(parse(text))
}

/// Load and parse a Caddyfile from a path
pub fn parse_file(path: impl AsRef<Path>) -> caddyclub_core::Result<Config> {
    let source = std::fs::read_to_string(path)?;
    Ok(parse(&source))
}
