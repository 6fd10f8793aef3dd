// Call graph assembly for Invoke Link.
// Turns the flat method collection into one call tree per entry point.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::cycle_guard::{CycleGuard, CycleGuardKind, NodeFrame};
use crate::domain::entry_point::join_mapping_path;
use crate::domain::method::{CalleeStub, EntryKind, MethodRecord};

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// A node in a materialized call tree.
///
/// Nodes are never shared: a method reached from two parents appears twice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallNode {
    pub signature: String,
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
    pub is_abstract: bool,
    /// Full request path, set on HTTP roots only.
    pub mapping_path: Option<String>,
    pub request_methods: Vec<String>,
    pub children: Vec<CallNode>,
}

impl CallNode {
    fn from_record(record: &MethodRecord) -> Self {
        Self {
            signature: record.signature.clone(),
            class_name: record.owner.name.clone(),
            method_name: record.name.clone(),
            parameters: record.parameters.clone(),
            is_abstract: record.is_abstract,
            mapping_path: None,
            request_methods: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_stub(stub: &CalleeStub, is_abstract: bool) -> Self {
        Self {
            signature: stub.signature.clone(),
            class_name: stub.owner.clone(),
            method_name: stub.name.clone(),
            parameters: stub.parameters.clone(),
            is_abstract,
            mapping_path: None,
            request_methods: Vec::new(),
            children: Vec::new(),
        }
    }

    fn frame(&self) -> NodeFrame {
        NodeFrame {
            signature: self.signature.clone(),
            class_name: self.class_name.clone(),
            method_name: self.method_name.clone(),
            parameters: self.parameters.clone(),
            mapping_path: self.mapping_path.clone(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CallNode::size).sum::<usize>()
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(CallNode::depth).max().unwrap_or(0)
    }

    /// Depth-first, pre-order visit of every node in the subtree.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a CallNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    pub fn find(&self, signature: &str) -> Option<&CallNode> {
        if self.signature == signature {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(signature))
    }
}

/// One call-tree forest per entry-point category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntryForest {
    pub http: Vec<CallNode>,
    pub rpc: Vec<CallNode>,
}

impl EntryForest {
    pub fn is_empty(&self) -> bool {
        self.http.is_empty() && self.rpc.is_empty()
    }

    pub fn len(&self) -> usize {
        self.http.len() + self.rpc.len()
    }

    pub fn roots(&self, kind: EntryKind) -> &[CallNode] {
        match kind {
            EntryKind::Http => &self.http,
            EntryKind::Rpc => &self.rpc,
            EntryKind::None => &[],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntryKind, &CallNode)> {
        self.http
            .iter()
            .map(|n| (EntryKind::Http, n))
            .chain(self.rpc.iter().map(|n| (EntryKind::Rpc, n)))
    }
}

/// Signature -> raw callee stubs.
#[derive(Debug, Default)]
pub struct CallIndex {
    edges: HashMap<String, Vec<CalleeStub>>,
}

impl CallIndex {
    /// Later records replace earlier ones with the same signature.
    pub fn build(records: &[Arc<MethodRecord>]) -> Self {
        let mut edges = HashMap::with_capacity(records.len());
        for record in records {
            edges.insert(record.signature.clone(), record.callees.clone());
        }
        Self { edges }
    }

    pub fn callees(&self, signature: &str) -> &[CalleeStub] {
        self.edges.get(signature).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Superclass or interface name -> methods of classes extending or implementing it.
#[derive(Debug, Default)]
pub struct AbstractIndex {
    implementations: HashMap<String, Vec<Arc<MethodRecord>>>,
}

impl AbstractIndex {
    /// Group by superclass, then group by each implemented interface.
    /// An interface grouping replaces a superclass grouping under the same name.
    pub fn build(records: &[Arc<MethodRecord>]) -> Self {
        let mut by_super: HashMap<String, Vec<Arc<MethodRecord>>> = HashMap::new();
        let mut by_interface: HashMap<String, Vec<Arc<MethodRecord>>> = HashMap::new();

        for record in records {
            let owner = &record.owner;
            if !owner.super_name.trim().is_empty() {
                by_super
                    .entry(owner.super_name.clone())
                    .or_default()
                    .push(Arc::clone(record));
            }
            for interface in &owner.interfaces {
                by_interface
                    .entry(interface.clone())
                    .or_default()
                    .push(Arc::clone(record));
            }
        }

        by_super.extend(by_interface);
        Self {
            implementations: by_super,
        }
    }

    pub fn implementations(&self, parent: &str) -> &[Arc<MethodRecord>] {
        self.implementations
            .get(parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Implementations of `parent` whose name and ordered parameter list match exactly.
    pub fn resolve<'a>(
        &'a self,
        parent: &str,
        name: &'a str,
        parameters: &'a [String],
    ) -> impl Iterator<Item = &'a Arc<MethodRecord>> + 'a {
        self.implementations(parent)
            .iter()
            .filter(move |m| m.name == name && m.parameters.as_slice() == parameters)
    }
}

/// Builds entry-point call trees from a flat method collection.
pub struct CallGraphAssembler {
    guard: Box<dyn CycleGuard>,
    max_depth: usize,
}

impl Default for CallGraphAssembler {
    fn default() -> Self {
        Self::new(CycleGuardKind::default(), DEFAULT_MAX_DEPTH)
    }
}

impl CallGraphAssembler {
    pub fn new(guard: CycleGuardKind, max_depth: usize) -> Self {
        Self::with_guard(guard.build(), max_depth)
    }

    pub fn with_guard(guard: Box<dyn CycleGuard>, max_depth: usize) -> Self {
        Self {
            guard,
            max_depth: max_depth.max(1),
        }
    }

    /// Assemble the HTTP and RPC forests.
    ///
    /// Duplicate signatures keep the last record in input order; the result is
    /// deterministic for a given input order.
    pub fn assemble(&self, records: Vec<MethodRecord>) -> EntryForest {
        if records.is_empty() {
            return EntryForest::default();
        }

        let records = dedupe_last_wins(records);
        let call_index = CallIndex::build(&records);
        let abstract_index = AbstractIndex::build(&records);
        let abstract_methods: HashSet<&str> = records
            .iter()
            .filter(|r| r.is_abstract)
            .map(|r| r.signature.as_str())
            .collect();

        let expansion = Expansion {
            call_index: &call_index,
            abstract_index: &abstract_index,
            abstract_methods: &abstract_methods,
            guard: self.guard.as_ref(),
            max_depth: self.max_depth,
        };

        let mut forest = EntryForest::default();
        for record in &records {
            let mut root = CallNode::from_record(record);
            match record.entry_kind {
                EntryKind::Http => {
                    root.mapping_path =
                        Some(join_mapping_path(&record.owner.base_path, &record.mapping_path));
                    root.request_methods = record.request_methods.clone();
                    expansion.expand_root(&mut root);
                    forest.http.push(root);
                }
                EntryKind::Rpc => {
                    expansion.expand_root(&mut root);
                    forest.rpc.push(root);
                }
                EntryKind::None => {}
            }
        }

        info!(
            "Assembled {} HTTP and {} RPC call trees from {} methods (guard: {})",
            forest.http.len(),
            forest.rpc.len(),
            records.len(),
            self.guard.name()
        );
        forest
    }
}

fn dedupe_last_wins(records: Vec<MethodRecord>) -> Vec<Arc<MethodRecord>> {
    let mut latest: HashMap<String, MethodRecord> = HashMap::with_capacity(records.len());
    for record in records {
        latest.insert(record.signature.clone(), record);
    }
    let mut unique: Vec<Arc<MethodRecord>> = latest.into_values().map(Arc::new).collect();
    unique.sort_by(|a, b| a.signature.cmp(&b.signature));
    unique
}

struct Expansion<'a> {
    call_index: &'a CallIndex,
    abstract_index: &'a AbstractIndex,
    abstract_methods: &'a HashSet<&'a str>,
    guard: &'a dyn CycleGuard,
    max_depth: usize,
}

impl Expansion<'_> {
    fn expand_root(&self, root: &mut CallNode) {
        let mut path = Vec::new();
        self.expand(root, &mut path);
    }

    fn expand(&self, node: &mut CallNode, path: &mut Vec<NodeFrame>) {
        if path.len() + 1 >= self.max_depth {
            if !self.call_index.callees(&node.signature).is_empty() {
                warn!(
                    "Call tree depth limit {} reached at {}; branch truncated",
                    self.max_depth, node.signature
                );
            }
            return;
        }
        path.push(node.frame());

        node.children = if self.abstract_methods.contains(node.signature.as_str()) {
            self.implementations_of(node)
        } else {
            self.callees_of(node, path)
        };

        for child in node.children.iter_mut() {
            self.expand(child, path);
        }
        path.pop();
    }

    fn implementations_of(&self, node: &CallNode) -> Vec<CallNode> {
        self.abstract_index
            .resolve(&node.class_name, &node.method_name, &node.parameters)
            .map(|m| CallNode::from_record(m))
            .collect()
    }

    fn callees_of(&self, node: &CallNode, path: &[NodeFrame]) -> Vec<CallNode> {
        let mut seen = HashSet::new();
        let mut children = Vec::new();
        for stub in self.call_index.callees(&node.signature) {
            if !seen.insert(stub.signature.as_str()) {
                continue;
            }
            if !self.guard.admits(path, &stub.signature) {
                debug!("Cycle guard rejected {} under {}", stub.signature, node.signature);
                continue;
            }
            let is_abstract = self.abstract_methods.contains(stub.signature.as_str());
            children.push(CallNode::from_stub(stub, is_abstract));
        }
        children
    }
}
