// Method and class records extracted from compiled artifacts.
// These are the units the call graph is assembled from.

use std::fmt;
use std::sync::Arc;

/// Entry-point classification of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Reachable through an HTTP request mapping.
    Http,
    /// Exposed as a remote service method.
    Rpc,
    None,
}

impl EntryKind {
    pub fn is_entry(&self) -> bool {
        !matches!(self, EntryKind::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntryKind::Http => "HTTP",
            EntryKind::Rpc => "RPC",
            EntryKind::None => "NONE",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One compiled class. Immutable once extracted and shared by all of its methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Internal name, e.g. `com/acme/UserController`.
    pub name: String,
    /// Empty when the class has no superclass other than `java/lang/Object`.
    pub super_name: String,
    pub interfaces: Vec<String>,
    /// Class-level request mapping, empty unless the class is an HTTP controller.
    pub base_path: String,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = super_name.into();
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }
}

/// A statically observed call site: the target as named by the instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalleeStub {
    pub signature: String,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub parameters: Vec<String>,
}

impl CalleeStub {
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            signature: method_signature(owner, name, descriptor),
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parameters: parse_parameter_descriptors(descriptor),
        }
    }
}

/// A method inside a class together with its raw outgoing call edges.
///
/// `callees` always holds the unresolved edge list; the resolved tree lives in
/// [`crate::domain::callgraph::CallNode`] and never writes back into the record.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRecord {
    pub signature: String,
    pub name: String,
    pub descriptor: String,
    pub parameters: Vec<String>,
    pub owner: Arc<ClassDescriptor>,
    pub is_abstract: bool,
    pub entry_kind: EntryKind,
    /// Method-level mapping fragment (HTTP entry points only).
    pub mapping_path: String,
    /// Request verbs declared by the mapping annotation; empty means any.
    pub request_methods: Vec<String>,
    pub callees: Vec<CalleeStub>,
}

impl MethodRecord {
    pub fn new(owner: Arc<ClassDescriptor>, name: &str, descriptor: &str) -> Self {
        Self {
            signature: method_signature(&owner.name, name, descriptor),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            parameters: parse_parameter_descriptors(descriptor),
            owner,
            is_abstract: false,
            entry_kind: EntryKind::None,
            mapping_path: String::new(),
            request_methods: Vec::new(),
            callees: Vec::new(),
        }
    }

    pub fn abstract_method(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_entry(mut self, kind: EntryKind, mapping_path: &str) -> Self {
        self.entry_kind = kind;
        self.mapping_path = mapping_path.to_string();
        self
    }

    pub fn calls(mut self, owner: &str, name: &str, descriptor: &str) -> Self {
        self.callees.push(CalleeStub::new(owner, name, descriptor));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.owner.name
    }
}

/// Build the identifying key of a method: owner, name and parameter descriptor.
///
/// The return type is dropped, so `com/acme/A#run(I)` names both `run(I)V` and `run(I)J`.
pub fn method_signature(owner: &str, name: &str, descriptor: &str) -> String {
    format!("{}#{}{}", owner, name, parameter_section(descriptor))
}

/// The `(...)` part of a method descriptor.
pub fn parameter_section(descriptor: &str) -> &str {
    match descriptor.find(')') {
        Some(end) if descriptor.starts_with('(') => &descriptor[..=end],
        _ => descriptor,
    }
}

/// Split a method descriptor's parameter section into individual field descriptors.
///
/// `(ILjava/lang/String;[[J)V` yields `["I", "Ljava/lang/String;", "[[J"]`.
/// A malformed tail is kept as a single trailing entry rather than dropped.
pub fn parse_parameter_descriptors(descriptor: &str) -> Vec<String> {
    let section = parameter_section(descriptor);
    let inner = section
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or("");

    let bytes = inner.as_bytes();
    let mut params = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                i += 1;
                continue;
            }
            b'L' => match inner[i..].find(';') {
                Some(offset) => i += offset + 1,
                None => i = bytes.len(),
            },
            _ => i += 1,
        }
        params.push(inner[start..i].to_string());
        start = i;
    }
    if start < bytes.len() {
        params.push(inner[start..].to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_drops_return_type() {
        assert_eq!(
            method_signature("com/acme/A", "run", "(ILjava/lang/String;)V"),
            "com/acme/A#run(ILjava/lang/String;)"
        );
        assert_eq!(method_signature("com/acme/A", "get", "()J"), "com/acme/A#get()");
    }

    #[test]
    fn test_parse_parameters() {
        assert_eq!(
            parse_parameter_descriptors("(ILjava/lang/String;[[J[Lcom/x/Y;Z)V"),
            vec!["I", "Ljava/lang/String;", "[[J", "[Lcom/x/Y;", "Z"]
        );
        assert!(parse_parameter_descriptors("()V").is_empty());
    }

    #[test]
    fn test_parse_parameters_unterminated_reference() {
        assert_eq!(parse_parameter_descriptors("(ILjava/lang)V"), vec!["I", "Ljava/lang"]);
    }

    #[test]
    fn test_record_builders() {
        let owner = Arc::new(ClassDescriptor::new("com/acme/Web").with_base_path("/api"));
        let record = MethodRecord::new(owner, "list", "()Ljava/util/List;")
            .with_entry(EntryKind::Http, "/users")
            .calls("com/acme/Repo", "findAll", "()Ljava/util/List;");

        assert_eq!(record.signature, "com/acme/Web#list()");
        assert_eq!(record.class_name(), "com/acme/Web");
        assert_eq!(record.callees[0].signature, "com/acme/Repo#findAll()");
        assert!(record.entry_kind.is_entry());
    }
}
