//! Cycle guards used while materializing call trees.
//!
//! A guard sees the chain of frames from the tree root down to the node being
//! expanded (the last frame) and decides whether a callee may become a child.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity of a tree node as seen by a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeFrame {
    pub signature: String,
    pub class_name: String,
    pub method_name: String,
    pub parameters: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_path: Option<String>,
}

/// Strategy deciding whether `candidate` may be added under the last frame of `path`.
pub trait CycleGuard: Send + Sync {
    fn admits(&self, path: &[NodeFrame], candidate: &str) -> bool;

    fn name(&self) -> &'static str;
}

/// Rejects a candidate whose signature appears anywhere in the JSON dump of the
/// node being expanded and its ancestors.
///
/// Substring matches count, so `a/Foo#x()` is rejected under `b/a/Foo#x()`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerializedContainmentGuard;

impl CycleGuard for SerializedContainmentGuard {
    fn admits(&self, path: &[NodeFrame], candidate: &str) -> bool {
        match serde_json::to_string(path) {
            Ok(dump) => !dump.contains(candidate),
            // Unreachable for plain string data; fall back to an exact check.
            Err(_) => !path.iter().any(|frame| frame.signature == candidate),
        }
    }

    fn name(&self) -> &'static str {
        "serialized"
    }
}

/// Rejects a candidate only if it exactly matches a signature on the root-to-node path.
#[derive(Debug, Default, Clone, Copy)]
pub struct AncestorPathGuard;

impl CycleGuard for AncestorPathGuard {
    fn admits(&self, path: &[NodeFrame], candidate: &str) -> bool {
        !path.iter().any(|frame| frame.signature == candidate)
    }

    fn name(&self) -> &'static str {
        "ancestor"
    }
}

/// Configurable selection of a guard.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleGuardKind {
    #[default]
    Serialized,
    Ancestor,
}

impl CycleGuardKind {
    pub fn build(&self) -> Box<dyn CycleGuard> {
        match self {
            CycleGuardKind::Serialized => Box::new(SerializedContainmentGuard),
            CycleGuardKind::Ancestor => Box::new(AncestorPathGuard),
        }
    }
}

impl FromStr for CycleGuardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serialized" | "containment" => Ok(CycleGuardKind::Serialized),
            "ancestor" | "path" => Ok(CycleGuardKind::Ancestor),
            other => Err(format!("unknown cycle guard '{}'", other)),
        }
    }
}

impl fmt::Display for CycleGuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleGuardKind::Serialized => write!(f, "serialized"),
            CycleGuardKind::Ancestor => write!(f, "ancestor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(signature: &str) -> NodeFrame {
        let (class_name, rest) = signature.split_once('#').unwrap();
        NodeFrame {
            signature: signature.to_string(),
            class_name: class_name.to_string(),
            method_name: rest.split('(').next().unwrap().to_string(),
            parameters: vec![],
            mapping_path: None,
        }
    }

    #[test]
    fn test_both_guards_reject_self() {
        let path = vec![frame("a/A#foo()")];
        assert!(!SerializedContainmentGuard.admits(&path, "a/A#foo()"));
        assert!(!AncestorPathGuard.admits(&path, "a/A#foo()"));
    }

    #[test]
    fn test_both_guards_reject_ancestor() {
        let path = vec![frame("a/A#foo()"), frame("a/B#bar()")];
        assert!(!SerializedContainmentGuard.admits(&path, "a/A#foo()"));
        assert!(!AncestorPathGuard.admits(&path, "a/A#foo()"));
        assert!(SerializedContainmentGuard.admits(&path, "a/C#baz()"));
        assert!(AncestorPathGuard.admits(&path, "a/C#baz()"));
    }

    #[test]
    fn test_serialized_guard_substring_false_positive() {
        let path = vec![frame("b/a/Foo#x()")];
        assert!(!SerializedContainmentGuard.admits(&path, "a/Foo#x()"));
        assert!(AncestorPathGuard.admits(&path, "a/Foo#x()"));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("ancestor".parse::<CycleGuardKind>(), Ok(CycleGuardKind::Ancestor));
        assert_eq!("Serialized".parse::<CycleGuardKind>(), Ok(CycleGuardKind::Serialized));
        assert!("bogus".parse::<CycleGuardKind>().is_err());
        assert_eq!(CycleGuardKind::default().build().name(), "serialized");
    }
}
