//! Entry Point Detection Module
//!
//! Classifies JVM methods as HTTP or RPC entry points from their annotations
//! and computes the normalized request path of HTTP endpoints.

use crate::domain::annotation::Annotation;
use crate::domain::method::EntryKind;

const REQUEST_MAPPING: &str = "Lorg/springframework/web/bind/annotation/RequestMapping;";

/// Shortcut mapping annotations and the verb each one implies.
const VERB_MAPPINGS: &[(&str, &str)] = &[
    ("Lorg/springframework/web/bind/annotation/GetMapping;", "GET"),
    ("Lorg/springframework/web/bind/annotation/PostMapping;", "POST"),
    ("Lorg/springframework/web/bind/annotation/PutMapping;", "PUT"),
    ("Lorg/springframework/web/bind/annotation/DeleteMapping;", "DELETE"),
    ("Lorg/springframework/web/bind/annotation/PatchMapping;", "PATCH"),
];

const RPC_SERVICES: &[&str] = &[
    "Lorg/apache/dubbo/config/annotation/DubboService;",
    "Lorg/apache/dubbo/config/annotation/Service;",
    "Lcom/alibaba/dubbo/config/annotation/Service;",
];

const PATH_SEPARATOR: char = '/';

/// Class-level facts that influence how the class's methods are classified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassMapping {
    pub base_path: String,
    pub rpc_service: bool,
}

/// The parts of a method declaration the detector looks at.
#[derive(Debug, Clone, Copy)]
pub struct MethodShape<'a> {
    pub name: &'a str,
    pub is_public: bool,
    pub is_static: bool,
    pub is_synthetic: bool,
}

/// Result of classifying one method.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    pub kind: EntryKind,
    /// Method-level mapping fragment, empty for non-HTTP methods.
    pub path: String,
    pub request_methods: Vec<String>,
}

impl EntryPoint {
    fn none() -> Self {
        Self {
            kind: EntryKind::None,
            path: String::new(),
            request_methods: Vec::new(),
        }
    }
}

/// Entry point detector for Spring Web and Dubbo annotated code.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryPointDetector;

impl EntryPointDetector {
    pub fn new() -> Self {
        Self
    }

    /// Read the class-level request mapping and remote-service marker.
    pub fn detect_class(&self, annotations: &[Annotation]) -> ClassMapping {
        let base_path = annotations
            .iter()
            .find(|a| a.is(REQUEST_MAPPING))
            .map(mapping_path)
            .unwrap_or_default();
        let rpc_service = annotations
            .iter()
            .any(|a| RPC_SERVICES.iter().any(|svc| a.is(svc)));

        ClassMapping {
            base_path,
            rpc_service,
        }
    }

    /// Classify one method given its own annotations and its class mapping.
    ///
    /// Web mappings take precedence over remote-service markers.
    pub fn detect_method(
        &self,
        class: &ClassMapping,
        method: MethodShape<'_>,
        annotations: &[Annotation],
    ) -> EntryPoint {
        for ann in annotations {
            if ann.is(REQUEST_MAPPING) {
                return EntryPoint {
                    kind: EntryKind::Http,
                    path: mapping_path(ann),
                    request_methods: ann.enum_names("method"),
                };
            }
            if let Some((_, verb)) = VERB_MAPPINGS.iter().find(|(desc, _)| ann.is(desc)) {
                return EntryPoint {
                    kind: EntryKind::Http,
                    path: mapping_path(ann),
                    request_methods: vec![verb.to_string()],
                };
            }
        }

        let method_marked = annotations
            .iter()
            .any(|a| RPC_SERVICES.iter().any(|svc| a.is(svc)));
        if method_marked || (class.rpc_service && is_service_method(method)) {
            return EntryPoint {
                kind: EntryKind::Rpc,
                ..EntryPoint::none()
            };
        }

        EntryPoint::none()
    }
}

fn is_service_method(method: MethodShape<'_>) -> bool {
    method.is_public
        && !method.is_static
        && !method.is_synthetic
        && !method.name.starts_with('<')
}

/// First non-empty `value` or `path` of a mapping annotation.
fn mapping_path(ann: &Annotation) -> String {
    ann.strings("value")
        .into_iter()
        .chain(ann.strings("path"))
        .find(|p| !p.is_empty())
        .unwrap_or_default()
}

/// Join a controller base path and a method path with exactly one separator.
///
/// Empty fragments collapse, and a non-empty result always starts with `/`.
pub fn join_mapping_path(base: &str, path: &str) -> String {
    let head = base.trim().trim_end_matches(PATH_SEPARATOR);
    let tail = path.trim().trim_start_matches(PATH_SEPARATOR);

    let joined = match (head.is_empty(), tail.is_empty()) {
        (true, true) => {
            let had_separator = base.contains(PATH_SEPARATOR) || path.contains(PATH_SEPARATOR);
            return if had_separator { "/".to_string() } else { String::new() };
        }
        (true, false) => tail.to_string(),
        (false, true) => head.to_string(),
        (false, false) => format!("{}{}{}", head, PATH_SEPARATOR, tail),
    };

    if joined.starts_with(PATH_SEPARATOR) {
        joined
    } else {
        format!("{}{}", PATH_SEPARATOR, joined)
    }
}
