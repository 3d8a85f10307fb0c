//! Longest-prefix routing of module paths to plugins.
//!
//! Routes live in a compressed prefix tree. Sibling edge labels never share
//! a first character once built, so lookup is deterministic; a node without
//! a plugin exists only to fork two or more subtrees.

use std::sync::Arc;

use crate::error::{ProxyError, Result};
use crate::module::Plugin;

#[derive(Default)]
struct Node {
    plugin: Option<Arc<dyn Plugin>>,
    children: Vec<Edge>,
}

struct Edge {
    label: String,
    node: Node,
}

impl Node {
    fn leaf(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin: Some(plugin),
            children: Vec::new(),
        }
    }
}

/// Maps module paths to plugins by longest registered prefix, with the
/// empty-mask route as the default.
#[derive(Default)]
pub struct Router {
    root: Node,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under `mask`. Registering a mask twice is an
    /// error; routes are fixed before serving starts.
    pub fn add_route(&mut self, mask: &str, plugin: Arc<dyn Plugin>) -> Result<()> {
        insert(&mut self.root, mask, mask, &plugin)
    }

    /// Plugin registered under the longest prefix of `path`, if any.
    pub fn lookup(&self, path: &str) -> Option<Arc<dyn Plugin>> {
        find(&self.root, path).cloned()
    }
}

fn insert(node: &mut Node, mask: &str, orig: &str, plugin: &Arc<dyn Plugin>) -> Result<()> {
    if mask.is_empty() {
        if node.plugin.is_some() {
            return Err(ProxyError::RouteConflict(orig.to_string()));
        }
        node.plugin = Some(plugin.clone());
        return Ok(());
    }

    for i in 0..node.children.len() {
        let label = node.children[i].label.clone();

        if let Some(rest) = mask.strip_prefix(label.as_str()) {
            return insert(&mut node.children[i].node, rest, orig, plugin);
        }

        if label.starts_with(mask) {
            // the edge label extends the new mask; split it
            let tail = label[mask.len()..].to_string();
            let edge = &mut node.children[i];
            let old = std::mem::take(&mut edge.node);
            edge.label = mask.to_string();
            edge.node = Node {
                plugin: Some(plugin.clone()),
                children: vec![Edge { label: tail, node: old }],
            };
            return Ok(());
        }

        let cp = common_prefix_len(mask, &label);
        if cp > 0 {
            // fork an intermediate node carrying both subtrees
            let tail_new = mask[cp..].to_string();
            let tail_old = label[cp..].to_string();
            let edge = &mut node.children[i];
            let old = std::mem::take(&mut edge.node);
            edge.label = label[..cp].to_string();
            edge.node = Node {
                plugin: None,
                children: vec![
                    Edge {
                        label: tail_new,
                        node: Node::leaf(plugin.clone()),
                    },
                    Edge {
                        label: tail_old,
                        node: old,
                    },
                ],
            };
            return Ok(());
        }
    }

    node.children.push(Edge {
        label: mask.to_string(),
        node: Node::leaf(plugin.clone()),
    });
    Ok(())
}

fn find<'a>(node: &'a Node, path: &str) -> Option<&'a Arc<dyn Plugin>> {
    for edge in &node.children {
        if let Some(rest) = path.strip_prefix(edge.label.as_str()) {
            return find(&edge.node, rest).or(node.plugin.as_ref());
        }
    }
    node.plugin.as_ref()
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            return len;
        }
        len += ca.len_utf8();
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{Module, ModuleRequest};
    use async_trait::async_trait;

    struct Stub(&'static str);

    #[async_trait]
    impl Plugin for Stub {
        async fn module_for(&self, _request: &ModuleRequest) -> Result<Box<dyn Module>> {
            Err(ProxyError::BadRequest("stub".into()))
        }

        fn name(&self) -> String {
            self.0.to_string()
        }
    }

    fn stub(name: &'static str) -> Arc<dyn Plugin> {
        Arc::new(Stub(name))
    }

    fn edge_lists(node: &Node) -> Vec<Vec<String>> {
        let mut res = Vec::new();
        if node.plugin.is_some() {
            res.push(Vec::new());
        }
        for edge in &node.children {
            for tail in edge_lists(&edge.node) {
                let mut item = vec![edge.label.clone()];
                item.extend(tail);
                res.push(item);
            }
        }
        res.sort();
        res
    }

    fn lists(r: &Router) -> Vec<Vec<String>> {
        edge_lists(&r.root)
    }

    fn owned(items: &[&[&str]]) -> Vec<Vec<String>> {
        items
            .iter()
            .map(|l| l.iter().map(|s| (*s).to_string()).collect())
            .collect()
    }

    #[test]
    fn test_insert_splits_edges() {
        let mut r = Router::new();
        r.add_route("", stub("a")).unwrap();
        assert!(r.add_route("", stub("dup")).is_err());
        r.add_route("gitlab.stageoffice.ru", stub("b")).unwrap();
        r.add_route("gitlab.com", stub("c")).unwrap();
        r.add_route("gitlab.stageoffice.ru/UCS-COMMON/schema", stub("d"))
            .unwrap();
        assert!(
            r.add_route("gitlab.stageoffice.ru/UCS-COMMON/schema", stub("dup"))
                .is_err()
        );
        r.add_route("gitlab.stageoffice.ru/UCS-CADDY-PLUGINS", stub("e"))
            .unwrap();

        assert_eq!(
            lists(&r),
            owned(&[
                &[],
                &["gitlab.", "com"],
                &["gitlab.", "stageoffice.ru"],
                &["gitlab.", "stageoffice.ru", "/UCS-C", "ADDY-PLUGINS"],
                &["gitlab.", "stageoffice.ru", "/UCS-C", "OMMON/schema"],
            ])
        );

        let cases = [
            ("", "a"),
            ("github.com/sirkon/goproxy", "a"),
            ("gitlab.com/repo/project", "c"),
            ("gitlab.stageoffice.ru/UCS-PLATFORM/marker", "b"),
            ("gitlab.stageoffice.ru/UCS-COMMON/schema/marker", "d"),
            ("gitlab.stageoffice.ru/UCS-CADDY-PLUGINS/algol", "e"),
            ("gitlab.org", "a"),
        ];
        for (path, want) in cases {
            assert_eq!(r.lookup(path).unwrap().name(), want, "path {path}");
        }

        r.add_route("gitlab.stageoffice.ru/UCS-PLATFORM/marker", stub("f"))
            .unwrap();
        r.add_route("gitlab.stageoffice.ru/UCS-PLATFORM", stub("g"))
            .unwrap();
        r.add_route("somehost.com", stub("y")).unwrap();
        r.add_route("gitlab.stageoffice.ru/UCS-C", stub("z")).unwrap();

        assert_eq!(
            lists(&r),
            owned(&[
                &[],
                &["gitlab.", "com"],
                &["gitlab.", "stageoffice.ru"],
                &["gitlab.", "stageoffice.ru", "/UCS-", "C"],
                &["gitlab.", "stageoffice.ru", "/UCS-", "C", "ADDY-PLUGINS"],
                &["gitlab.", "stageoffice.ru", "/UCS-", "C", "OMMON/schema"],
                &["gitlab.", "stageoffice.ru", "/UCS-", "PLATFORM"],
                &["gitlab.", "stageoffice.ru", "/UCS-", "PLATFORM", "/marker"],
                &["somehost.com"],
            ])
        );
    }

    #[test]
    fn test_longest_prefix_with_fallback() {
        let mut r = Router::new();
        r.add_route("", stub("a")).unwrap();
        r.add_route("gitlab.", stub("b")).unwrap();
        r.add_route("gitlab.com/u/m", stub("c")).unwrap();

        assert_eq!(r.lookup("gitlab.com/u/m/sub").unwrap().name(), "c");
        assert_eq!(r.lookup("gitlab.com/other").unwrap().name(), "b");
        assert_eq!(r.lookup("github.com/x").unwrap().name(), "a");
    }

    #[test]
    fn test_no_default_route_yields_none() {
        let mut r = Router::new();
        r.add_route("gitlab.com", stub("b")).unwrap();
        assert!(r.lookup("github.com/x").is_none());
        assert!(r.lookup("gitlab.com/x").is_some());
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let masks = [
            ("", "root"),
            ("gitlab.", "dot"),
            ("gitlab.com", "com"),
            ("gitlab.com/u/m", "exact"),
            ("somehost.com", "other"),
        ];
        let mut fwd = Router::new();
        for (mask, name) in masks {
            fwd.add_route(mask, stub(name)).unwrap();
        }
        let mut rev = Router::new();
        for (mask, name) in masks.iter().rev() {
            rev.add_route(mask, stub(name)).unwrap();
        }

        for q in [
            "",
            "gitlab.com/u/m/sub",
            "gitlab.com/u/m",
            "gitlab.com/other",
            "gitlab.org/x",
            "somehost.com/a/b",
            "github.com/a/b",
        ] {
            assert_eq!(
                fwd.lookup(q).unwrap().name(),
                rev.lookup(q).unwrap().name(),
                "query {q}"
            );
        }
    }
}
