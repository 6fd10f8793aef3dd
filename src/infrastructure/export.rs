//! Forest exporters: pretty JSON and Graphviz DOT.

use std::io;

use serde::Serialize;

use crate::api::dto::ForestDto;
use crate::domain::callgraph::{CallNode, EntryForest};
use crate::domain::method::EntryKind;
use crate::ports::ForestExporter;

pub struct JsonExporter;

impl ForestExporter for JsonExporter {
    fn render(&self, forest: &EntryForest) -> io::Result<String> {
        pretty_json(&ForestDto::from(forest))
    }
}

fn pretty_json<T: Serialize>(value: &T) -> io::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Renders every tree as a Graphviz digraph.
///
/// Node ids are per occurrence, so a method reached from several places shows
/// up once per place and every tree edge becomes exactly one DOT edge.
pub struct DotExporter;

impl ForestExporter for DotExporter {
    fn render(&self, forest: &EntryForest) -> io::Result<String> {
        let mut lines = Vec::new();
        lines.push("digraph InvokeLinks {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=11, shape=box];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=9];".to_string());

        let mut next_id = 0;
        for (kind, root) in forest.iter() {
            lines.push(String::new());
            write_tree(&mut lines, root, kind, None, &mut next_id);
        }

        lines.push("}".to_string());
        Ok(lines.join("\n"))
    }
}

fn write_tree(
    lines: &mut Vec<String>,
    node: &CallNode,
    kind: EntryKind,
    parent: Option<usize>,
    next_id: &mut usize,
) {
    let id = *next_id;
    *next_id += 1;

    let (style, fill, border) = match parent {
        None => ("filled,rounded", entry_color(kind), "#40a02b"),
        Some(_) if node.is_abstract => ("filled,dashed", "#f9e2af", "#df8e1d"),
        Some(_) => ("filled", "#89b4fa", "#1e66f5"),
    };
    lines.push(format!(
        "    n{} [label=\"{}\", style=\"{}\", fillcolor=\"{}\", color=\"{}\"];",
        id,
        escape_label(&node_label(node, kind, parent.is_none())),
        style,
        fill,
        border
    ));
    if let Some(parent) = parent {
        lines.push(format!("    n{} -> n{};", parent, id));
    }
    for child in &node.children {
        write_tree(lines, child, kind, Some(id), next_id);
    }
}

fn node_label(node: &CallNode, kind: EntryKind, is_root: bool) -> String {
    if !is_root {
        return node.signature.clone();
    }
    match (&node.mapping_path, node.request_methods.is_empty()) {
        (Some(path), true) => format!("[{}] {}\n{}", kind, path, node.signature),
        (Some(path), false) => format!(
            "[{}] {} {}\n{}",
            kind,
            node.request_methods.join("|"),
            path,
            node.signature
        ),
        (None, _) => format!("[{}]\n{}", kind, node.signature),
    }
}

fn entry_color(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Rpc => "#cba6f7",
        _ => "#a6e3a1",
    }
}

fn escape_label(label: &str) -> String {
    label
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
