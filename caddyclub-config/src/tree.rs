//! Tree operations over directive lists and configs
//!
//! All operations take a snapshot and return a new tree; nothing is mutated
//! in place. Lookups recurse through nested blocks.

use crate::parser::ast::{Config, Directive, SiteBlock};

/// Find a directive by id anywhere in the tree
pub fn find_directive<'a>(directives: &'a [Directive], id: &str) -> Option<&'a Directive> {
    directives.iter().find_map(|d| {
        if d.id == id {
            Some(d)
        } else {
            find_directive(d.children(), id)
        }
    })
}

/// Replace the directive with `id` by `f(directive)`
pub fn update_directive<F>(directives: &[Directive], id: &str, f: F) -> Vec<Directive>
where
    F: FnOnce(Directive) -> Directive,
{
    let mut f = Some(f);
    update_in(directives, id, &mut f)
}

fn update_in<F>(directives: &[Directive], id: &str, f: &mut Option<F>) -> Vec<Directive>
where
    F: FnOnce(Directive) -> Directive,
{
    directives
        .iter()
        .map(|d| {
            if d.id == id {
                if let Some(f) = f.take() {
                    return f(d.clone());
                }
            }
            let mut copy = d.clone();
            if let Some(block) = &d.block {
                copy.block = Some(update_in(block, id, &mut *f));
            }
            copy
        })
        .collect()
}

/// Remove the directive with `id` (and its block) from the tree
pub fn delete_directive(directives: &[Directive], id: &str) -> Vec<Directive> {
    directives
        .iter()
        .filter(|d| d.id != id)
        .map(|d| {
            let mut copy = d.clone();
            if let Some(block) = &d.block {
                copy.block = Some(delete_directive(block, id));
            }
            copy
        })
        .collect()
}

/// Keep only the top-level directives matching `keep`
pub fn retain_directives<P>(directives: &[Directive], keep: P) -> Vec<Directive>
where
    P: Fn(&Directive) -> bool,
{
    directives.iter().filter(|d| keep(d)).cloned().collect()
}

impl Config {
    /// Site block by id
    pub fn site_block(&self, id: &str) -> Option<&SiteBlock> {
        self.site_blocks.iter().find(|s| s.id == id)
    }

    /// New config with `site` appended
    pub fn add_site_block(&self, site: SiteBlock) -> Config {
        let mut config = self.clone();
        config.site_blocks.push(site);
        config
    }

    /// New config without the site block `id`
    pub fn remove_site_block(&self, id: &str) -> Config {
        Config {
            site_blocks: self
                .site_blocks
                .iter()
                .filter(|s| s.id != id)
                .cloned()
                .collect(),
            global_options: self.global_options.clone(),
        }
    }

    /// New config with the site block `id` replaced by `f(site)`
    pub fn update_site_block<F>(&self, id: &str, f: F) -> Config
    where
        F: FnOnce(SiteBlock) -> SiteBlock,
    {
        let mut config = self.clone();
        if let Some(pos) = config.site_blocks.iter().position(|s| s.id == id) {
            let site = config.site_blocks.remove(pos);
            config.site_blocks.insert(pos, f(site));
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn sample() -> Vec<Directive> {
        vec![
            Directive::new("1", "encode").with_args(["gzip"]),
            Directive::new("2", "handle").with_block(vec![
                Directive::new("3", "reverse_proxy").with_args(["localhost:8080"]),
                Directive::new("4", "header").with_block(vec![
                    Directive::new("5", "X-Service").with_args(["api"]),
                ]),
            ]),
        ]
    }

    #[test]
    fn test_find_nested() {
        let tree = sample();
        assert_eq!(find_directive(&tree, "5").map(|d| d.name.as_str()), Some("X-Service"));
        assert!(find_directive(&tree, "missing").is_none());
    }

    #[test]
    fn test_update_nested() {
        let tree = sample();
        let updated = update_directive(&tree, "3", |d| d.with_args(["localhost:9090"]));
        assert_eq!(find_directive(&updated, "3").unwrap().args, ["localhost:9090"]);
        // Original snapshot untouched
        assert_eq!(find_directive(&tree, "3").unwrap().args, ["localhost:8080"]);
    }

    #[test]
    fn test_delete_nested() {
        let tree = sample();
        let pruned = delete_directive(&tree, "4");
        assert!(find_directive(&pruned, "4").is_none());
        assert!(find_directive(&pruned, "5").is_none());
        assert_eq!(pruned[1].children().len(), 1);
    }

    #[test]
    fn test_delete_top_level() {
        let pruned = delete_directive(&sample(), "2");
        assert_eq!(pruned.len(), 1);
        assert_eq!(pruned[0].id, "1");
    }

    #[test]
    fn test_retain() {
        let kept = retain_directives(&sample(), |d| d.name != "encode");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "handle");
    }

    #[test]
    fn test_site_block_operations() {
        let config = parse("a.com {\n}\nb.com {\n}\n");
        let a_id = config.site_blocks[0].id.clone();

        let added = config.add_site_block(SiteBlock::new("new", ["c.com"]));
        assert_eq!(added.site_blocks.len(), 3);

        let removed = added.remove_site_block(&a_id);
        assert_eq!(removed.site_blocks.len(), 2);
        assert_eq!(removed.site_blocks[0].addresses, ["b.com"]);

        let updated = removed.update_site_block("new", |s| s.with_caddy_id("c"));
        assert_eq!(updated.site_block("new").unwrap().caddy_id.as_deref(), Some("c"));
        assert_eq!(updated.site_blocks[1].id, "new");
    }
}
