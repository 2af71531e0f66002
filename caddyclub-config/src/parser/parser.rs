//! Caddyfile block parser
//!
//! Consumes the source line by line and keeps a stack of open frames (global
//! options, site blocks, directive blocks). Tokens within a line are split
//! further at standalone braces, so `a.com { respond hi }` parses the same as
//! its multi-line form.
//!
//! Structure errors are never fatal: a stray `}` is ignored and any frame
//! still open at end of input is closed implicitly.

use crate::ids::{IdGenerator, SequentialIds};
use crate::parser::ast::*;
use crate::parser::lexer::{is_block_close, is_block_open, tokenize_line};

enum FrameKind {
    /// Root of a directive-list fragment; never popped by `}`
    Fragment,
    Global,
    Site(SiteBlock),
    Directive(Directive),
    /// A `{` with nothing to attach to; its children go to the parent
    Detached,
}

struct Frame {
    kind: FrameKind,
    children: Vec<Directive>,
}

impl Frame {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }
}

/// Parser state
pub struct Parser<'a> {
    ids: &'a mut dyn IdGenerator,
    config: Config,
    stack: Vec<Frame>,
    fragment: Vec<Directive>,
    line_no: usize,
}

impl<'a> Parser<'a> {
    pub fn new(ids: &'a mut dyn IdGenerator) -> Self {
        Self {
            ids,
            config: Config::new(),
            stack: Vec::new(),
            fragment: Vec::new(),
            line_no: 0,
        }
    }

    /// Parse an entire Caddyfile
    pub fn parse(mut self, source: &str) -> Config {
        for line in source.lines() {
            self.parse_line(line);
        }
        self.finish();
        self.config
    }

    /// Parse a list of directive lines with no site or global framing
    pub fn parse_fragment<'s, I>(mut self, lines: I) -> Vec<Directive>
    where
        I: IntoIterator<Item = &'s str>,
    {
        self.stack.push(Frame::new(FrameKind::Fragment));
        for line in lines {
            self.parse_line(line);
        }
        self.finish();
        self.fragment
    }

    fn parse_line(&mut self, line: &str) {
        self.line_no += 1;
        let trimmed = line.trim();
        let tokens = tokenize_line(trimmed);
        if tokens.is_empty() {
            return;
        }

        let mut segment = Vec::new();
        for token in tokens {
            if is_block_open(&token) {
                self.open(std::mem::take(&mut segment), trimmed);
            } else if is_block_close(&token) {
                if !segment.is_empty() {
                    self.statement(std::mem::take(&mut segment), trimmed);
                }
                self.close();
            } else {
                segment.push(token);
            }
        }

        if !segment.is_empty() {
            self.statement(segment, trimmed);
        }
    }

    /// A segment followed by `{`
    fn open(&mut self, segment: Vec<String>, raw: &str) {
        if segment.is_empty() {
            let Some(top) = self.stack.last_mut() else {
                self.stack.push(Frame::new(FrameKind::Global));
                return;
            };

            // A bare `{` continues the previous directive when it has no block yet
            let attachable = top.children.last().is_some_and(|d| d.block.is_none());
            let kind = match top.children.pop() {
                Some(prev) if attachable => FrameKind::Directive(prev),
                Some(prev) => {
                    top.children.push(prev);
                    FrameKind::Detached
                }
                None => FrameKind::Detached,
            };
            self.stack.push(Frame::new(kind));
            return;
        }

        if self.stack.is_empty() {
            let site = self.site_block(segment, raw);
            self.stack.push(Frame::new(FrameKind::Site(site)));
        } else {
            let directive = self.directive(segment, raw);
            self.stack.push(Frame::new(FrameKind::Directive(directive)));
        }
    }

    /// A segment without a following `{`
    fn statement(&mut self, segment: Vec<String>, raw: &str) {
        if self.stack.is_empty() {
            // Single-line site block
            let site = self.site_block(segment, raw);
            self.config.site_blocks.push(site);
            return;
        }

        if self.stack.len() == 1 && segment[0] == "@id" {
            if let FrameKind::Site(site) = &mut self.stack[0].kind {
                site.caddy_id = segment.get(1).cloned();
                return;
            }
        }

        let directive = self.directive(segment, raw);
        self.attach(vec![directive]);
    }

    fn close(&mut self) {
        match self.stack.last() {
            None => {
                tracing::debug!("line {}: ignoring unmatched '}}'", self.line_no);
            }
            Some(frame) if matches!(frame.kind, FrameKind::Fragment) => {
                tracing::debug!("line {}: ignoring '}}' at fragment root", self.line_no);
            }
            Some(_) => {
                if let Some(frame) = self.stack.pop() {
                    self.complete(frame);
                }
            }
        }
    }

    fn finish(&mut self) {
        while let Some(frame) = self.stack.pop() {
            if !matches!(frame.kind, FrameKind::Fragment) {
                tracing::debug!("closing unterminated block at end of input");
            }
            self.complete(frame);
        }
    }

    fn complete(&mut self, frame: Frame) {
        let Frame { kind, children } = frame;
        match kind {
            FrameKind::Fragment => self.fragment.extend(children),
            FrameKind::Global => {
                self.config
                    .global_options
                    .get_or_insert_with(Vec::new)
                    .extend(children);
            }
            FrameKind::Site(mut site) => {
                site.directives = children;
                self.config.site_blocks.push(site);
            }
            FrameKind::Directive(mut directive) => {
                directive.block = Some(children);
                self.attach(vec![directive]);
            }
            FrameKind::Detached => self.attach(children),
        }
    }

    fn attach(&mut self, directives: Vec<Directive>) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.extend(directives),
            None => {
                tracing::debug!("dropping {} directive(s) with no parent block", directives.len());
            }
        }
    }

    fn site_block(&mut self, segment: Vec<String>, raw: &str) -> SiteBlock {
        let mut addresses: Vec<String> = segment
            .iter()
            .flat_map(|token| token.split(','))
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .collect();
        if addresses.is_empty() {
            addresses.push(raw.trim_end_matches('{').trim().to_string());
        }
        SiteBlock::new(self.ids.next_id(), addresses)
    }

    fn directive(&mut self, mut segment: Vec<String>, raw: &str) -> Directive {
        let args = segment.split_off(1);
        let name = segment.pop().unwrap_or_default();
        Directive::new(self.ids.next_id(), name)
            .with_args(args)
            .with_raw(raw)
    }
}

/// Parse a Caddyfile with deterministic sequential ids
pub fn parse(source: &str) -> Config {
    let mut ids = SequentialIds::default();
    parse_with_ids(source, &mut ids)
}

/// Parse a Caddyfile drawing ids from `ids`
pub fn parse_with_ids(source: &str, ids: &mut dyn IdGenerator) -> Config {
    Parser::new(ids).parse(source)
}

/// Parse directive lines (the body of a block) into a directive list
pub fn parse_directives<'s, I>(lines: I, ids: &mut dyn IdGenerator) -> Vec<Directive>
where
    I: IntoIterator<Item = &'s str>,
{
    Parser::new(ids).parse_fragment(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(directives: &[Directive]) -> Vec<&str> {
        directives.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_parse_empty() {
        let config = parse("");
        assert!(config.global_options.is_none());
        assert!(config.site_blocks.is_empty());
    }

    #[test]
    fn test_parse_site_block() {
        let config = parse("app.example.com {\n    reverse_proxy localhost:3000\n}\n");
        assert_eq!(config.site_blocks.len(), 1);
        let site = &config.site_blocks[0];
        assert_eq!(site.addresses, ["app.example.com"]);
        assert_eq!(site.directives.len(), 1);
        assert_eq!(site.directives[0].name, "reverse_proxy");
        assert_eq!(site.directives[0].args, ["localhost:3000"]);
        assert_eq!(site.directives[0].block, None);
        assert_eq!(site.directives[0].raw.as_deref(), Some("reverse_proxy localhost:3000"));
    }

    #[test]
    fn test_parse_one_line_site_block() {
        let config = parse("app.example.com { reverse_proxy localhost:3000 }");
        let site = &config.site_blocks[0];
        assert_eq!(site.addresses, ["app.example.com"]);
        assert_eq!(site.directives[0].line(), "reverse_proxy localhost:3000");
    }

    #[test]
    fn test_parse_global_options() {
        let config = parse("{\n    email admin@example.com\n    admin off\n}\n\nexample.com {\n    respond ok\n}\n");
        let global = config.global_options.unwrap();
        assert_eq!(names(&global), ["email", "admin"]);
        assert_eq!(config.site_blocks.len(), 1);
    }

    #[test]
    fn test_parse_comma_addresses() {
        let config = parse("a.com, b.com c.com,d.com {\n}\n");
        assert_eq!(config.site_blocks[0].addresses, ["a.com", "b.com", "c.com", "d.com"]);
    }

    #[test]
    fn test_single_line_site_without_block() {
        let config = parse("localhost\n:8080 {\n    respond hi\n}\n");
        assert_eq!(config.site_blocks.len(), 2);
        assert_eq!(config.site_blocks[0].addresses, ["localhost"]);
        assert!(config.site_blocks[0].directives.is_empty());
        assert_eq!(config.site_blocks[1].addresses, [":8080"]);
    }

    #[test]
    fn test_nested_blocks() {
        let source = r#"
example.com {
    file_server browse {
        root /var/www/files
    }
    header {
        X-Frame-Options DENY
        Cache-Control "public, max-age=3600"
    }
}
"#;
        let config = parse(source);
        let site = &config.site_blocks[0];
        assert_eq!(names(&site.directives), ["file_server", "header"]);
        let file_server = &site.directives[0];
        assert_eq!(file_server.args, ["browse"]);
        assert_eq!(file_server.children()[0].line(), "root /var/www/files");
        let header = &site.directives[1];
        assert_eq!(header.children()[1].args, [r#""public, max-age=3600""#]);
    }

    #[test]
    fn test_caddy_id_promoted() {
        let config = parse("example.com {\n    @id main-site\n    respond ok\n}\n");
        let site = &config.site_blocks[0];
        assert_eq!(site.caddy_id.as_deref(), Some("main-site"));
        assert_eq!(names(&site.directives), ["respond"]);
    }

    #[test]
    fn test_nested_at_id_is_directive() {
        let config = parse("example.com {\n    handle {\n        @id inner\n    }\n}\n");
        let site = &config.site_blocks[0];
        assert!(site.caddy_id.is_none());
        assert_eq!(site.directives[0].children()[0].name, "@id");
    }

    #[test]
    fn test_unclosed_block_is_kept() {
        let config = parse("example.com {\n    handle {\n        respond hi\n");
        assert_eq!(config.site_blocks.len(), 1);
        let handle = &config.site_blocks[0].directives[0];
        assert_eq!(handle.name, "handle");
        assert_eq!(handle.children()[0].line(), "respond hi");
    }

    #[test]
    fn test_stray_close_ignored() {
        let config = parse("}\nexample.com {\n    respond hi\n}\n}\n");
        assert_eq!(config.site_blocks.len(), 1);
        assert_eq!(config.site_blocks[0].directives.len(), 1);
    }

    #[test]
    fn test_quoted_brace_is_not_structural() {
        let config = parse("example.com {\n    respond \"}\" 200\n    encode gzip\n}\n");
        let site = &config.site_blocks[0];
        assert_eq!(names(&site.directives), ["respond", "encode"]);
        assert_eq!(site.directives[0].args, [r#""}""#, "200"]);
    }

    #[test]
    fn test_placeholder_braces() {
        let config = parse("example.com {\n    redir https://new.example.com{uri} 301\n}\n");
        let redir = &config.site_blocks[0].directives[0];
        assert_eq!(redir.args, ["https://new.example.com{uri}", "301"]);
        assert!(redir.block.is_none());
    }

    #[test]
    fn test_bare_open_brace_attaches_to_previous() {
        let config = parse("example.com {\n    handle\n    {\n        respond hi\n    }\n}\n");
        let handle = &config.site_blocks[0].directives[0];
        assert_eq!(handle.name, "handle");
        assert_eq!(handle.children().len(), 1);
    }

    #[test]
    fn test_comments_skipped() {
        let config = parse("# header\nexample.com { # site\n    # inside\n    respond hi # trailing\n}\n");
        let site = &config.site_blocks[0];
        assert_eq!(site.directives.len(), 1);
        assert_eq!(site.directives[0].args, ["hi"]);
    }

    #[test]
    fn test_ids_are_unique_and_injected() {
        let mut ids = SequentialIds::new("t");
        let config = parse_with_ids("a.com {\n    handle {\n        respond hi\n    }\n}\n", &mut ids);
        let site = &config.site_blocks[0];
        assert_eq!(site.id, "t-1");
        assert_eq!(site.directives[0].id, "t-2");
        assert_eq!(site.directives[0].children()[0].id, "t-3");
    }

    #[test]
    fn test_parse_directives_fragment() {
        let mut ids = SequentialIds::new("f");
        let directives = parse_directives(
            ["reverse_proxy localhost:8080", "header {", "X-Service api", "}", "}"],
            &mut ids,
        );
        assert_eq!(names(&directives), ["reverse_proxy", "header"]);
        assert_eq!(directives[1].children()[0].line(), "X-Service api");
    }
}
