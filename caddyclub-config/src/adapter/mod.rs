//! Caddyfile ↔ admin JSON adapters
//!
//! `directives` maps single directives to route handlers and back; `json`
//! assembles those into the full administrative document. Items the mapper
//! cannot translate are dropped and reported as [`Diagnostic`]s, never as
//! errors.

mod directives;
mod json;

pub use directives::{directive_to_handler, handler_to_directive};
pub use json::{
    caddyfile_to_json, from_admin_config, from_admin_config_with_ids, json_to_caddyfile,
    route_to_site_block, site_block_to_route, to_admin_config, Converted,
};

use serde::Serialize;

/// Kind of non-fatal conversion issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Directive with no handler mapping
    UnknownDirective,
    /// Handler with no directive mapping
    UnknownHandler,
    /// Known conversion that loses information
    LossyMapping,
}

/// A conversion issue reported to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Directive name or handler tag concerned
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unknown_directive(name: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnknownDirective,
            subject: name.to_string(),
            message: format!("directive '{}' has no handler mapping; skipped", name),
        }
    }

    pub fn unknown_handler(tag: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnknownHandler,
            subject: tag.to_string(),
            message: format!("handler '{}' has no directive mapping; skipped", tag),
        }
    }

    pub fn lossy(subject: &str, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::LossyMapping,
            subject: subject.to_string(),
            message: message.into(),
        }
    }
}

/// Log a diagnostic and record it
pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!(
        kind = ?diagnostic.kind,
        subject = %diagnostic.subject,
        "{}",
        diagnostic.message
    );
    diagnostics.push(diagnostic);
}
