//! Change impact selection.
//!
//! Narrows an entry forest down to the trees that reach a changed class.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::callgraph::{CallNode, EntryForest};

const SOURCE_ROOTS: &[&str] = &["src/main/java/", "src/main/kotlin/", "src/main/scala/"];
const SOURCE_EXTENSIONS: &[&str] = &[".java", ".kt", ".scala", ".class"];

/// The set of classes touched by a change, in internal (`a/b/C`) form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    classes: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a class by binary (`a.b.C`) or internal (`a/b/C`) name.
    pub fn add_class(&mut self, name: &str) {
        let internal = name.trim().replace('.', "/");
        if !internal.is_empty() {
            self.classes.insert(internal);
        }
    }

    /// Add a changed source or class file path, e.g. `svc/src/main/java/a/b/C.java`.
    pub fn add_path(&mut self, path: &str) {
        if let Some(class) = class_from_path(path) {
            self.classes.insert(class);
        }
    }

    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::new();
        for path in paths {
            set.add_path(path);
        }
        set
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when `class_name` or its outer class is in the set.
    pub fn touches(&self, class_name: &str) -> bool {
        let outer = class_name.split('$').next().unwrap_or(class_name);
        self.classes.contains(class_name) || self.classes.contains(outer)
    }
}

fn class_from_path(path: &str) -> Option<String> {
    let normalized = path.trim().replace('\\', "/");
    let stem = SOURCE_EXTENSIONS
        .iter()
        .find_map(|ext| normalized.strip_suffix(ext))?;

    let relative = SOURCE_ROOTS
        .iter()
        .find_map(|root| stem.find(root).map(|at| &stem[at + root.len()..]))
        .or_else(|| stem.find("classes/").map(|at| &stem[at + "classes/".len()..]))
        .unwrap_or(stem);

    let class = relative.trim_start_matches('/');
    (!class.is_empty()).then(|| class.to_string())
}

/// Keep only the trees in which some node belongs to a changed class.
pub fn impacted(forest: &EntryForest, changes: &ChangeSet) -> EntryForest {
    let keep = |roots: &[CallNode]| -> Vec<CallNode> {
        roots
            .iter()
            .filter(|root| reaches_change(root, changes))
            .cloned()
            .collect()
    };
    EntryForest {
        http: keep(&forest.http),
        rpc: keep(&forest.rpc),
    }
}

fn reaches_change(root: &CallNode, changes: &ChangeSet) -> bool {
    let mut hit = false;
    root.walk(&mut |node| {
        if !hit && changes.touches(&node.class_name) {
            hit = true;
        }
    });
    hit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(class_name: &str, children: Vec<CallNode>) -> CallNode {
        CallNode {
            signature: format!("{}#m()", class_name),
            class_name: class_name.to_string(),
            method_name: "m".to_string(),
            parameters: vec![],
            is_abstract: false,
            mapping_path: None,
            request_methods: vec![],
            children,
        }
    }

    #[test]
    fn test_class_from_source_path() {
        let set = ChangeSet::from_paths([
            "order-service/src/main/java/com/acme/OrderService.java",
            "target/classes/com/acme/Repo.class",
            "README.md",
        ]);
        let classes: Vec<&str> = set.classes().collect();
        assert_eq!(classes, vec!["com/acme/OrderService", "com/acme/Repo"]);
    }

    #[test]
    fn test_touches_nested_class() {
        let mut set = ChangeSet::new();
        set.add_class("com.acme.Order");
        assert!(set.touches("com/acme/Order$Line"));
        assert!(!set.touches("com/acme/OrderLine"));
    }

    #[test]
    fn test_impacted_selects_reaching_trees() {
        let forest = EntryForest {
            http: vec![
                node("a/Web", vec![node("a/Svc", vec![node("a/Repo", vec![])])]),
                node("a/Other", vec![]),
            ],
            rpc: vec![node("a/Rpc", vec![])],
        };
        let mut changes = ChangeSet::new();
        changes.add_class("a/Repo");

        let hit = impacted(&forest, &changes);
        assert_eq!(hit.http.len(), 1);
        assert_eq!(hit.http[0].class_name, "a/Web");
        assert!(hit.rpc.is_empty());
    }
}
