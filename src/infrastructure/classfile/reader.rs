//! Binary method reader: one class file in, method records out.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::annotation::{is_annotation_attribute, parse_annotations};
use super::bootstrap::{BootstrapMethods, BOOTSTRAP_METHODS};
use super::bytecode::CodeBody;
use super::constant_pool::ConstantPool;
use super::parser::{Parser, Result};
use crate::domain::annotation::Annotation;
use crate::domain::entry_point::{EntryPointDetector, MethodShape};
use crate::domain::method::{parameter_section, CalleeStub, ClassDescriptor, MethodRecord};
use crate::error::ClassFileError;
use crate::infrastructure::exclusion::ExclusionSet;
use crate::ports::ArtifactReader;

pub const MAGIC: u32 = 0xCAFE_BABE;
/// Newest class file major version accepted (Java 25).
pub const MAX_MAJOR_VERSION: u16 = 69;
const OBJECT: &str = "java/lang/Object";

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_BRIDGE: u16 = 0x0040;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;

/// Everything extracted from one class file.
#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub class: Arc<ClassDescriptor>,
    pub access_flags: u16,
    pub methods: Vec<MethodRecord>,
}

struct RawMethod<'d, 'p> {
    access_flags: u16,
    name: &'p str,
    descriptor: &'p str,
    annotations: Vec<Annotation>,
    code: Option<CodeBody<'d>>,
}

/// Parse a class file image.
///
/// When `namespace` is set, only callees whose owner lies in that package or
/// one of its subpackages are kept.
pub fn parse_class(data: &[u8], namespace: Option<&str>) -> Result<ParsedClass> {
    let detector = EntryPointDetector::new();
    let mut parser = Parser::new(data);

    let magic = parser.read_u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    let minor = parser.read_u16()?;
    let major = parser.read_u16()?;
    if major > MAX_MAJOR_VERSION {
        return Err(ClassFileError::UnsupportedVersion { major, minor });
    }

    let pool = ConstantPool::parse(&mut parser)?;
    let access_flags = parser.read_u16()?;
    let this_name = pool.class_name(parser.read_u16()?)?.to_string();
    let super_index = parser.read_u16()?;
    let super_name = match super_index {
        0 => String::new(),
        index => match pool.class_name(index)? {
            OBJECT => String::new(),
            name => name.to_string(),
        },
    };

    let interface_count = parser.read_u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(parser.read_u16()?)?.to_string());
    }

    let field_count = parser.read_u16()?;
    for _ in 0..field_count {
        parser.advance_by(6)?;
        skip_attributes(&mut parser)?;
    }

    let method_count = parser.read_u16()?;
    let mut raw_methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        raw_methods.push(read_method(&mut parser, &pool)?);
    }

    let mut class_annotations = Vec::new();
    let mut bootstrap = BootstrapMethods::default();
    let attribute_count = parser.read_u16()?;
    for _ in 0..attribute_count {
        let name = pool.utf8(parser.read_u16()?)?;
        let len = parser.read_u32()? as usize;
        let mut body = parser.sub_parser(len)?;
        match name {
            BOOTSTRAP_METHODS => bootstrap = BootstrapMethods::parse(&mut body)?,
            other if is_annotation_attribute(other) => {
                class_annotations.extend(parse_annotations(&mut body, &pool)?)
            }
            _ => {}
        }
    }

    let mapping = detector.detect_class(&class_annotations);
    let class = Arc::new(ClassDescriptor {
        name: this_name,
        super_name,
        interfaces,
        base_path: mapping.base_path.clone(),
    });

    // A covariant bridge shares the erased signature of the method it forwards to.
    let declared: HashSet<(&str, &str)> = raw_methods
        .iter()
        .filter(|raw| raw.access_flags & ACC_BRIDGE == 0)
        .map(|raw| (raw.name, parameter_section(raw.descriptor)))
        .collect();

    let mut methods = Vec::with_capacity(raw_methods.len());
    for raw in raw_methods {
        if raw.access_flags & ACC_BRIDGE != 0
            && declared.contains(&(raw.name, parameter_section(raw.descriptor)))
        {
            continue;
        }
        let shape = MethodShape {
            name: raw.name,
            is_public: raw.access_flags & ACC_PUBLIC != 0,
            is_static: raw.access_flags & ACC_STATIC != 0,
            is_synthetic: raw.access_flags & ACC_SYNTHETIC != 0,
        };
        let entry = detector.detect_method(&mapping, shape, &raw.annotations);

        let mut record = MethodRecord::new(Arc::clone(&class), raw.name, raw.descriptor);
        record.is_abstract = raw.access_flags & ACC_ABSTRACT != 0;
        record.entry_kind = entry.kind;
        record.mapping_path = entry.path;
        record.request_methods = entry.request_methods;
        if let Some(code) = &raw.code {
            record.callees = collect_callees(code, &pool, &bootstrap, namespace)?;
        }
        methods.push(record);
    }

    Ok(ParsedClass {
        class,
        access_flags,
        methods,
    })
}

fn read_method<'d, 'p>(
    parser: &mut Parser<'d>,
    pool: &'p ConstantPool,
) -> Result<RawMethod<'d, 'p>> {
    let access_flags = parser.read_u16()?;
    let name = pool.utf8(parser.read_u16()?)?;
    let descriptor = pool.utf8(parser.read_u16()?)?;
    let mut annotations = Vec::new();
    let mut code = None;

    let attribute_count = parser.read_u16()?;
    for _ in 0..attribute_count {
        let attribute = pool.utf8(parser.read_u16()?)?;
        let len = parser.read_u32()? as usize;
        let mut body = parser.sub_parser(len)?;
        match attribute {
            "Code" => code = Some(CodeBody::parse(&mut body)?),
            other if is_annotation_attribute(other) => {
                annotations.extend(parse_annotations(&mut body, pool)?)
            }
            _ => {}
        }
    }

    Ok(RawMethod {
        access_flags,
        name,
        descriptor,
        annotations,
        code,
    })
}

fn skip_attributes(parser: &mut Parser<'_>) -> Result<()> {
    let count = parser.read_u16()?;
    for _ in 0..count {
        parser.advance_by(2)?;
        let len = parser.read_u32()? as usize;
        parser.advance_by(len)?;
    }
    Ok(())
}

/// Unique call targets in first-seen order, restricted to the namespace when one is set.
fn collect_callees(
    code: &CodeBody<'_>,
    pool: &ConstantPool,
    bootstrap: &BootstrapMethods,
    namespace: Option<&str>,
) -> Result<Vec<CalleeStub>> {
    let mut seen = HashSet::new();
    let mut callees = Vec::new();
    for call in code.invocations(pool, bootstrap)? {
        if let Some(namespace) = namespace {
            if !in_namespace(&call.owner, namespace) {
                continue;
            }
        }
        let stub = CalleeStub::new(&call.owner, &call.name, &call.descriptor);
        if seen.insert(stub.signature.clone()) {
            callees.push(stub);
        }
    }
    Ok(callees)
}

/// `owner` is in package `namespace` or below it. An empty namespace admits everything.
pub fn in_namespace(owner: &str, namespace: &str) -> bool {
    let namespace = namespace.trim_end_matches('/');
    namespace.is_empty()
        || owner
            .strip_prefix(namespace)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// [`ArtifactReader`] over `.class` files on disk.
#[derive(Debug, Clone, Default)]
pub struct ClassFileReader {
    exclusions: ExclusionSet,
}

impl ClassFileReader {
    pub fn new(exclusions: ExclusionSet) -> Self {
        Self { exclusions }
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }
}

impl ArtifactReader for ClassFileReader {
    fn extract(&self, path: &Path, namespace: Option<&str>) -> Result<Vec<MethodRecord>> {
        let data = fs::read(path)?;
        parse_class(&data, namespace).map(|parsed| parsed.methods)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclusions.matches_all(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::annotation::ElementValue;
    use crate::domain::method::EntryKind;
    use crate::infrastructure::classfile::bytecode::InvokeKind;
    use crate::infrastructure::classfile::writer::{ClassFileWriter, MethodSpec};

    fn mapping(kind: &str, path: &str) -> Annotation {
        Annotation::new(format!("Lorg/springframework/web/bind/annotation/{};", kind)).with_element(
            "value",
            ElementValue::Array(vec![ElementValue::Const(path.to_string())]),
        )
    }

    #[test]
    fn test_reads_hierarchy_and_callees() {
        let bytes = ClassFileWriter::new("com/acme/OrderService")
            .super_class("com/acme/BaseService")
            .implements("com/acme/Api")
            .method(
                MethodSpec::new("place", "(Ljava/lang/String;I)V")
                    .calls(InvokeKind::Virtual, "com/acme/Repo", "save", "(Ljava/lang/String;)Z")
                    .calls(InvokeKind::Static, "java/util/Objects", "requireNonNull", "(Ljava/lang/Object;)Ljava/lang/Object;")
                    .calls(InvokeKind::Virtual, "com/acme/Repo", "save", "(Ljava/lang/String;)Z"),
            )
            .to_bytes();

        let parsed = parse_class(&bytes, None).unwrap();
        assert_eq!(parsed.class.name, "com/acme/OrderService");
        assert_eq!(parsed.class.super_name, "com/acme/BaseService");
        assert_eq!(parsed.class.interfaces, vec!["com/acme/Api"]);

        let method = &parsed.methods[0];
        assert_eq!(method.signature, "com/acme/OrderService#place(Ljava/lang/String;I)");
        assert_eq!(method.parameters, vec!["Ljava/lang/String;", "I"]);
        let callees: Vec<_> = method.callees.iter().map(|c| c.signature.as_str()).collect();
        assert_eq!(
            callees,
            vec!["com/acme/Repo#save(Ljava/lang/String;)", "java/util/Objects#requireNonNull(Ljava/lang/Object;)"]
        );
    }

    #[test]
    fn test_namespace_filters_callees() {
        let bytes = ClassFileWriter::new("com/acme/A")
            .method(
                MethodSpec::new("run", "()V")
                    .calls(InvokeKind::Virtual, "com/acme/B", "go", "()V")
                    .calls(InvokeKind::Virtual, "org/other/C", "go", "()V"),
            )
            .to_bytes();

        let parsed = parse_class(&bytes, Some("com/acme")).unwrap();
        assert_eq!(parsed.methods[0].callees.len(), 1);
        assert_eq!(parsed.methods[0].callees[0].owner, "com/acme/B");
    }

    #[test]
    fn test_object_super_is_blank_and_abstract_flag_kept() {
        let bytes = ClassFileWriter::interface("com/acme/Api")
            .method(MethodSpec::abstract_method("call", "()V"))
            .to_bytes();
        let parsed = parse_class(&bytes, None).unwrap();
        assert_eq!(parsed.class.super_name, "");
        assert!(parsed.access_flags & ACC_INTERFACE != 0);
        assert!(parsed.methods[0].is_abstract);
        assert!(parsed.methods[0].callees.is_empty());
    }

    #[test]
    fn test_http_and_rpc_detection() {
        let bytes = ClassFileWriter::new("com/acme/UserController")
            .annotation(mapping("RequestMapping", "/users"))
            .method(MethodSpec::new("list", "()V").annotation(mapping("GetMapping", "/all")))
            .method(MethodSpec::new("helper", "()V"))
            .to_bytes();
        let parsed = parse_class(&bytes, None).unwrap();
        assert_eq!(parsed.class.base_path, "/users");
        assert_eq!(parsed.methods[0].entry_kind, EntryKind::Http);
        assert_eq!(parsed.methods[0].mapping_path, "/all");
        assert_eq!(parsed.methods[0].request_methods, vec!["GET"]);
        assert_eq!(parsed.methods[1].entry_kind, EntryKind::None);

        let bytes = ClassFileWriter::new("com/acme/RpcImpl")
            .annotation(Annotation::new("Lorg/apache/dubbo/config/annotation/DubboService;"))
            .method(MethodSpec::new("<init>", "()V"))
            .method(MethodSpec::new("query", "(J)V"))
            .method(MethodSpec::new("util", "()V").access(ACC_PUBLIC | ACC_STATIC))
            .to_bytes();
        let parsed = parse_class(&bytes, None).unwrap();
        let kinds: Vec<_> = parsed.methods.iter().map(|m| m.entry_kind).collect();
        assert_eq!(kinds, vec![EntryKind::None, EntryKind::Rpc, EntryKind::None]);
    }

    #[test]
    fn test_rejects_bad_magic_and_truncation() {
        assert!(matches!(
            parse_class(&[0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 52], None),
            Err(ClassFileError::BadMagic(0xdead_beef))
        ));

        let bytes = ClassFileWriter::new("a/B").method(MethodSpec::new("x", "()V")).to_bytes();
        assert!(parse_class(&bytes[..bytes.len() - 3], None).is_err());
    }

    #[test]
    fn test_rejects_future_version() {
        let bytes = ClassFileWriter::new("a/B").major_version(MAX_MAJOR_VERSION + 1).to_bytes();
        assert!(matches!(
            parse_class(&bytes, None),
            Err(ClassFileError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_reader_surfaces_failures() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("Bad.class");
        fs::write(&bad, b"not a class").unwrap();

        let reader = ClassFileReader::default();
        assert!(matches!(reader.extract(&bad, None), Err(ClassFileError::BadMagic(_))));
        assert!(matches!(
            reader.extract(&dir.path().join("Missing.class"), None),
            Err(ClassFileError::Io(_))
        ));
    }

    #[test]
    fn test_exclusions_apply_to_paths() {
        let reader = ClassFileReader::new(ExclusionSet::new(["**/dto/**"]).unwrap());
        assert!(reader.is_excluded(Path::new("target/classes/com/acme/dto/UserDto.class")));
        assert!(!reader.is_excluded(Path::new("target/classes/com/acme/web/UserController.class")));
        assert!(!ClassFileReader::default().is_excluded(Path::new("com/acme/dto/UserDto.class")));
    }

    #[test]
    fn test_namespace_is_a_package_boundary() {
        assert!(in_namespace("com/acme/B", "com/acme"));
        assert!(in_namespace("com/acme/sub/C", "com/acme/"));
        assert!(in_namespace("org/x/Y", ""));
        assert!(!in_namespace("com/acmecorp/B", "com/acme"));
        assert!(!in_namespace("com/acme", "com/acme"));

        let bytes = ClassFileWriter::new("com/acme/A")
            .method(
                MethodSpec::new("run", "()V")
                    .calls(InvokeKind::Virtual, "com/acmecorp/Billing", "charge", "()V")
                    .calls(InvokeKind::Virtual, "com/acme/pay/Billing", "charge", "()V"),
            )
            .to_bytes();
        let parsed = parse_class(&bytes, Some("com/acme")).unwrap();
        let owners: Vec<_> = parsed.methods[0].callees.iter().map(|c| c.owner.as_str()).collect();
        assert_eq!(owners, vec!["com/acme/pay/Billing"]);
    }

    #[test]
    fn test_covariant_bridge_does_not_shadow_real_method() {
        let bytes = ClassFileWriter::new("com/acme/UserService")
            .implements("com/acme/BaseService")
            .method(
                MethodSpec::new("findById", "(Ljava/lang/Long;)Lcom/acme/User;")
                    .calls(InvokeKind::Virtual, "com/acme/UserRepo", "load", "(Ljava/lang/Long;)Lcom/acme/User;"),
            )
            .method(
                MethodSpec::new("findById", "(Ljava/lang/Long;)Ljava/lang/Object;")
                    .access(ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC)
                    .calls(
                        InvokeKind::Virtual,
                        "com/acme/UserService",
                        "findById",
                        "(Ljava/lang/Long;)Lcom/acme/User;",
                    ),
            )
            .to_bytes();

        let parsed = parse_class(&bytes, None).unwrap();
        assert_eq!(parsed.methods.len(), 1);
        assert_eq!(
            parsed.methods[0].callees[0].signature,
            "com/acme/UserRepo#load(Ljava/lang/Long;)"
        );
    }

    #[test]
    fn test_erased_parameter_bridge_is_kept() {
        // `save(Object)` forwards to `save(User)` and is what interface dispatch reaches.
        let bytes = ClassFileWriter::new("com/acme/UserService")
            .method(MethodSpec::new("save", "(Lcom/acme/User;)V"))
            .method(
                MethodSpec::new("save", "(Ljava/lang/Object;)V")
                    .access(ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC)
                    .calls(InvokeKind::Virtual, "com/acme/UserService", "save", "(Lcom/acme/User;)V"),
            )
            .to_bytes();

        let parsed = parse_class(&bytes, None).unwrap();
        let signatures: Vec<_> = parsed.methods.iter().map(|m| m.signature.as_str()).collect();
        assert_eq!(
            signatures,
            vec![
                "com/acme/UserService#save(Lcom/acme/User;)",
                "com/acme/UserService#save(Ljava/lang/Object;)"
            ]
        );
    }
}
