//! Caddyfile serializer
//!
//! Emits canonical text: tab indentation, one statement per line, the global
//! options block first and a blank line between blocks. Comments and the
//! original spacing are not reproduced.

use crate::parser::ast::{Config, Directive, SiteBlock};

/// Serialize a whole config
pub fn serialize(config: &Config) -> String {
    let mut blocks = Vec::new();

    if let Some(global) = config.global_options.as_ref().filter(|g| !g.is_empty()) {
        let mut block = String::from("{\n");
        block.push_str(&serialize_directives(global, 1));
        block.push('}');
        blocks.push(block);
    }

    blocks.extend(config.site_blocks.iter().map(serialize_site_block));

    if blocks.is_empty() {
        return String::new();
    }

    let mut text = blocks.join("\n\n");
    text.push('\n');
    text
}

/// Serialize one site block, without a trailing newline
pub fn serialize_site_block(site: &SiteBlock) -> String {
    let mut out = format!("{} {{\n", site.addresses.join(" "));
    if let Some(caddy_id) = &site.caddy_id {
        out.push_str(&format!("\t@id {}\n", caddy_id));
    }
    out.push_str(&serialize_directives(&site.directives, 1));
    out.push('}');
    out
}

/// Serialize a directive list at the given indentation depth.
/// Every line, including the last, ends with a newline.
pub fn serialize_directives(directives: &[Directive], depth: usize) -> String {
    let mut out = String::new();
    for directive in directives {
        write_directive(&mut out, directive, depth);
    }
    out
}

fn write_directive(out: &mut String, directive: &Directive, depth: usize) {
    let indent = "\t".repeat(depth);
    match directive.block.as_deref() {
        Some(children) if !children.is_empty() => {
            out.push_str(&format!("{}{} {{\n", indent, directive.line()));
            for child in children {
                write_directive(out, child, depth + 1);
            }
            out.push_str(&format!("{}}}\n", indent));
        }
        _ => {
            out.push_str(&format!("{}{}\n", indent, directive.line()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_serialize_site_block() {
        let site = SiteBlock::new("s-1", ["app.example.com", "www.example.com"])
            .with_caddy_id("app")
            .with_directives(vec![
                Directive::new("d-1", "reverse_proxy").with_args(["localhost:3000"]),
                Directive::new("d-2", "header").with_block(vec![
                    Directive::new("d-3", "X-Frame-Options").with_args(["DENY"]),
                ]),
            ]);

        assert_eq!(
            serialize_site_block(&site),
            "app.example.com www.example.com {\n\t@id app\n\treverse_proxy localhost:3000\n\theader {\n\t\tX-Frame-Options DENY\n\t}\n}"
        );
    }

    #[test]
    fn test_global_options_first() {
        let config = Config {
            site_blocks: vec![SiteBlock::new("s-1", [":8080"])
                .with_directives(vec![Directive::new("d-1", "respond").with_args(["ok"])])],
            global_options: Some(vec![Directive::new("g-1", "admin").with_args(["off"])]),
        };

        assert_eq!(
            serialize(&config),
            "{\n\tadmin off\n}\n\n:8080 {\n\trespond ok\n}\n"
        );
    }

    #[test]
    fn test_empty_global_options_omitted() {
        let config = Config {
            site_blocks: vec![SiteBlock::new("s-1", ["a.com"])],
            global_options: Some(Vec::new()),
        };
        assert_eq!(serialize(&config), "a.com {\n}\n");
    }

    #[test]
    fn test_empty_config() {
        assert_eq!(serialize(&Config::new()), "");
    }

    #[test]
    fn test_empty_block_renders_inline() {
        let directives = vec![Directive::new("d-1", "handle").with_block(Vec::new())];
        assert_eq!(serialize_directives(&directives, 0), "handle\n");
    }

    #[test]
    fn test_comments_and_spacing_dropped() {
        let source = "# top\n\n\nexample.com   {   # note\n\n    respond   hi\n\n}\n";
        assert_eq!(serialize(&parse(source)), "example.com {\n\trespond hi\n}\n");
    }

    #[test]
    fn test_idempotent() {
        let source = r#"
{
    email ops@example.com
}

a.com, b.com {
    @id sites
    encode gzip zstd
    handle /api/* {
        reverse_proxy /api localhost:9000
    }
    respond "Hello World" 200
}

:8080 { file_server browse }
"#;
        let once = serialize(&parse(source));
        let twice = serialize(&parse(&once));
        assert_eq!(once, twice);
    }
}
