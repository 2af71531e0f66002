//! Plausibility check for untrusted Caddyfile text
//!
//! Text is scored line by line before it reaches the parser. Obvious
//! non-Caddyfile input (JSON, HTML, PHP) is rejected outright; everything
//! else needs a confidence of at least [`MIN_CONFIDENCE`].

use crate::parser::lexer::{is_block_close, is_block_open, tokenize_line};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Lowest confidence accepted as a Caddyfile
pub const MIN_CONFIDENCE: u8 = 30;

const KEYWORD_SCORE: i32 = 15;
const ADDRESS_SCORE: i32 = 10;
const BRACE_SCORE: i32 = 5;
const SCRIPT_PENALTY: i32 = 20;

/// Directive names that usually start a Caddyfile line
const KEYWORDS: &[&str] = &[
    "reverse_proxy",
    "file_server",
    "respond",
    "redir",
    "encode",
    "header",
    "root",
    "tls",
    "log",
    "handle",
    "handle_path",
    "handle_errors",
    "route",
    "rewrite",
    "uri",
    "php_fastcgi",
    "basicauth",
    "basic_auth",
    "import",
    "try_files",
    "templates",
    "request_body",
    "bind",
    "abort",
    "error",
    "metrics",
];

const SCRIPT_MARKERS: &[&str] = &["function(", "const ", "let ", "var "];

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(\*\.)?([a-z0-9-]+\.)+[a-z][a-z0-9-]*(:\d+)?$|^:\d+$|^localhost(:\d+)?$")
        .expect("valid address regex")
});

/// Outcome of a plausibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    /// 0 to 100
    pub confidence: u8,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// 1-based line of each warning, in the same order
    #[serde(skip)]
    pub warning_lines: Vec<usize>,
}

impl ValidationReport {
    fn reject(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            confidence: 0,
            warnings: Vec::new(),
            errors: vec![error.into()],
            warning_lines: Vec::new(),
        }
    }
}

fn looks_like_json(text: &str) -> bool {
    (text.starts_with('{') || text.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(text)
            .is_ok_and(|v| v.is_object() || v.is_array())
}

fn is_address(token: &str) -> bool {
    ADDRESS.is_match(&token.trim_end_matches(',').to_ascii_lowercase())
}

/// Score `text` as a Caddyfile
pub fn validate(text: &str) -> ValidationReport {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return ValidationReport::reject("input is empty");
    }
    if looks_like_json(trimmed) {
        return ValidationReport::reject("input is JSON, not a Caddyfile");
    }
    // Markup anywhere in the text rejects it, not just at the top
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.contains("<!doctype") || lowered.contains("<html") {
        return ValidationReport::reject("input is an HTML document, not a Caddyfile");
    }
    if trimmed.contains("<?php") || trimmed.contains("<?=") {
        return ValidationReport::reject("input is PHP source, not a Caddyfile");
    }

    let mut score: i32 = 0;
    let mut warnings = Vec::new();
    let mut warning_lines = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let tokens = tokenize_line(line);
        if tokens
            .first()
            .is_some_and(|first| KEYWORDS.contains(&first.as_str()))
        {
            score += KEYWORD_SCORE;
        }
        if tokens.iter().any(|t| is_address(t)) {
            score += ADDRESS_SCORE;
        }
        if tokens.len() == 1 && (is_block_open(&tokens[0]) || is_block_close(&tokens[0])) {
            score += BRACE_SCORE;
        }
        if SCRIPT_MARKERS.iter().any(|m| line.contains(m)) {
            score -= SCRIPT_PENALTY;
            warning_lines.push(index + 1);
            warnings.push(format!(
                "line {}: looks like script source: {}",
                index + 1,
                line
            ));
        }
    }

    let confidence = score.clamp(0, 100) as u8;
    let valid = confidence >= MIN_CONFIDENCE;
    let errors = if valid {
        Vec::new()
    } else {
        vec![format!(
            "confidence {} is below {}; input does not look like a Caddyfile",
            confidence, MIN_CONFIDENCE
        )]
    };

    tracing::debug!(confidence, valid, warnings = warnings.len(), "validated input");

    ValidationReport {
        valid,
        confidence,
        warnings,
        errors,
        warning_lines,
    }
}

/// Validate and turn a rejection into an error
pub fn ensure_valid(text: &str) -> caddyclub_core::Result<ValidationReport> {
    let report = validate(text);
    if report.valid {
        Ok(report)
    } else {
        Err(caddyclub_core::Error::ValidationRejected {
            errors: report.errors,
        })
    }
}
