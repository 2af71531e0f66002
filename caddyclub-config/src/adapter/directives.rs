//! Directive ↔ handler mapping
//!
//! Forward: one directive, with its block, becomes at most one handler.
//! Reverse: one handler becomes at most one directive. Values copied into
//! JSON are unquoted; values copied back are quoted when they need it.

use crate::adapter::{report, Diagnostic};
use crate::ids::IdGenerator;
use crate::parser::ast::Directive;
use crate::parser::lexer::{quote, unquote};
use caddyclub_core::config::{
    Browse, EncodeHandler, FileServerHandler, Handler, HeadersHandler, ResponseHeaderOps,
    Rewrite, ReverseProxyHandler, StaticResponseHandler, StatusCode, Upstream,
};
use indexmap::IndexMap;

const DEFAULT_ENCODING: &str = "gzip";
const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// Map one directive to a route handler
pub fn directive_to_handler(
    directive: &Directive,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Handler> {
    match directive.name.as_str() {
        "reverse_proxy" => reverse_proxy(directive, diagnostics),
        "file_server" => Some(file_server(directive)),
        "respond" => Some(respond(directive)),
        "encode" => Some(encode(directive)),
        "header" => header(directive, diagnostics),
        "redir" => redir(directive, diagnostics),
        // Server-level or consumed by other handlers
        "root" | "tls" | "log" => None,
        name => {
            report(diagnostics, Diagnostic::unknown_directive(name));
            None
        }
    }
}

fn reverse_proxy(directive: &Directive, diagnostics: &mut Vec<Diagnostic>) -> Option<Handler> {
    let mut upstreams: Vec<Upstream> = directive
        .args
        .last()
        .map(|dial| vec![Upstream::new(unquote(dial))])
        .unwrap_or_default();

    // `to` lines inside the block add further upstreams
    for child in directive.children().iter().filter(|c| c.name == "to") {
        upstreams.extend(child.args.iter().map(|a| Upstream::new(unquote(a))));
    }

    if upstreams.is_empty() {
        report(
            diagnostics,
            Diagnostic::lossy("reverse_proxy", "reverse_proxy without an upstream; skipped"),
        );
        return None;
    }

    let rewrite = if directive.args.len() > 1 {
        Some(Rewrite {
            uri: unquote(&directive.args[0]),
        })
    } else {
        None
    };

    Some(Handler::ReverseProxy(ReverseProxyHandler {
        upstreams,
        rewrite,
        ..Default::default()
    }))
}

fn file_server(directive: &Directive) -> Handler {
    let browse = directive
        .args
        .iter()
        .any(|a| a == "browse")
        .then(Browse::default);

    let root = directive
        .children()
        .iter()
        .find(|c| c.name == "root")
        .and_then(|c| c.first_arg())
        .map(unquote);

    Handler::FileServer(FileServerHandler {
        browse,
        root,
        ..Default::default()
    })
}

fn respond(directive: &Directive) -> Handler {
    let body = directive
        .args
        .iter()
        .map(|a| unquote(a))
        .collect::<Vec<_>>()
        .join(" ");

    Handler::StaticResponse(StaticResponseHandler {
        body: Some(body),
        ..Default::default()
    })
}

fn encode(directive: &Directive) -> Handler {
    let encodings = if directive.args.is_empty() {
        vec![DEFAULT_ENCODING.to_string()]
    } else {
        directive.args.iter().map(|a| unquote(a)).collect()
    };
    Handler::Encode(EncodeHandler {
        encodings,
        ..Default::default()
    })
}

fn header(directive: &Directive, diagnostics: &mut Vec<Diagnostic>) -> Option<Handler> {
    if !directive.has_children() {
        report(
            diagnostics,
            Diagnostic::lossy("header", "header without a block is not converted"),
        );
        return None;
    }

    let set: IndexMap<String, Vec<String>> = directive
        .children()
        .iter()
        .map(|child| {
            let value = child
                .args
                .iter()
                .map(|a| unquote(a))
                .collect::<Vec<_>>()
                .join(" ");
            (child.name.clone(), vec![value])
        })
        .collect();

    Some(Handler::Headers(HeadersHandler {
        response: Some(ResponseHeaderOps {
            set,
            ..Default::default()
        }),
        ..Default::default()
    }))
}

fn redir(directive: &Directive, diagnostics: &mut Vec<Diagnostic>) -> Option<Handler> {
    let Some(target) = directive.first_arg() else {
        report(diagnostics, Diagnostic::lossy("redir", "redir without a target; skipped"));
        return None;
    };

    let status = match directive.args.get(1).map(String::as_str) {
        None => DEFAULT_REDIRECT_STATUS,
        Some("permanent") => 301,
        Some("temporary") => 302,
        Some(code) => code.parse().unwrap_or_else(|_| {
            report(
                diagnostics,
                Diagnostic::lossy(
                    "redir",
                    format!("unsupported redirect status '{}'; using 302", code),
                ),
            );
            DEFAULT_REDIRECT_STATUS
        }),
    };

    let mut headers = IndexMap::new();
    headers.insert("Location".to_string(), vec![unquote(target)]);

    Some(Handler::StaticResponse(StaticResponseHandler {
        status_code: Some(StatusCode::Code(status)),
        headers: Some(headers),
        ..Default::default()
    }))
}

/// Map one route handler back to a directive
pub fn handler_to_directive(
    handler: &Handler,
    ids: &mut dyn IdGenerator,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Directive> {
    let unmapped = handler.unmapped_fields();
    if !unmapped.is_empty() {
        report(
            diagnostics,
            Diagnostic::lossy(
                handler.name(),
                format!("fields {} have no directive form and are not kept", unmapped.join(", ")),
            ),
        );
    }

    match handler {
        Handler::ReverseProxy(h) => {
            let Some(first) = h.upstreams.first() else {
                report(
                    diagnostics,
                    Diagnostic::lossy("reverse_proxy", "reverse_proxy without upstreams; skipped"),
                );
                return None;
            };
            if h.upstreams.len() > 1 {
                report(
                    diagnostics,
                    Diagnostic::lossy(
                        "reverse_proxy",
                        format!("only the first of {} upstreams is kept", h.upstreams.len()),
                    ),
                );
            }
            if let Some(rewrite) = &h.rewrite {
                report(
                    diagnostics,
                    Diagnostic::lossy(
                        "reverse_proxy",
                        format!("rewrite to '{}' is not kept", rewrite.uri),
                    ),
                );
            }
            Some(Directive::new(ids.next_id(), "reverse_proxy").with_args([quote(&first.dial)]))
        }

        Handler::FileServer(h) => {
            let mut directive = Directive::new(ids.next_id(), "file_server");
            if h.browse.is_some() {
                directive.args.push("browse".to_string());
            }
            if let Some(root) = &h.root {
                let root = Directive::new(ids.next_id(), "root").with_args([quote(root)]);
                directive.block = Some(vec![root]);
            }
            Some(directive)
        }

        Handler::StaticResponse(h) => {
            if let Some(body) = &h.body {
                if let Some(status) = &h.status_code {
                    report(
                        diagnostics,
                        Diagnostic::lossy(
                            "static_response",
                            format!("status {} of a response body is not kept", status),
                        ),
                    );
                }
                return Some(Directive::new(ids.next_id(), "respond").with_args([quote(body)]));
            }

            if let Some(location) = h.location() {
                let status = match &h.status_code {
                    Some(status) => status.to_string(),
                    None => {
                        report(
                            diagnostics,
                            Diagnostic::lossy(
                                "static_response",
                                "redirect without a status code; written as 302",
                            ),
                        );
                        DEFAULT_REDIRECT_STATUS.to_string()
                    }
                };
                return Some(
                    Directive::new(ids.next_id(), "redir")
                        .with_args([quote(location), status]),
                );
            }

            report(
                diagnostics,
                Diagnostic::lossy("static_response", "static_response without body or Location; skipped"),
            );
            None
        }

        Handler::Encode(h) => {
            let encodings = if h.encodings.is_empty() {
                vec![DEFAULT_ENCODING.to_string()]
            } else {
                h.encodings.clone()
            };
            Some(Directive::new(ids.next_id(), "encode").with_args(encodings))
        }

        Handler::Headers(h) => {
            let set = h.response.as_ref().map(|r| &r.set).filter(|s| !s.is_empty());
            let Some(set) = set else {
                report(
                    diagnostics,
                    Diagnostic::lossy("headers", "headers handler without response.set; skipped"),
                );
                return None;
            };
            let children = set
                .iter()
                .map(|(name, values)| {
                    Directive::new(ids.next_id(), name.as_str()).with_args([quote(&values.join(", "))])
                })
                .collect();
            Some(Directive::new(ids.next_id(), "header").with_block(children))
        }

        Handler::Opaque(h) => {
            report(diagnostics, Diagnostic::unknown_handler(&h.handler));
            None
        }
    }
}
