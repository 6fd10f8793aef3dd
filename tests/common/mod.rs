//! Shared fixtures: synthetic class roots written to temp directories.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use invoke_link::domain::annotation::{Annotation, ElementValue};
use invoke_link::infrastructure::classfile::bytecode::InvokeKind;
use invoke_link::infrastructure::classfile::{ClassFileWriter, MethodSpec};

pub const STRING: &str = "Ljava/lang/String;";

/// Write `class` under `root` at its package path and return the file path.
pub fn write_class(root: &Path, name: &str, class: ClassFileWriter) -> PathBuf {
    let path = root.join(format!("{}.class", name));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, class.to_bytes()).unwrap();
    path
}

pub fn write_pom(root: &Path, group_id: &str) {
    fs::write(
        root.join("pom.xml"),
        format!(
            "<project><modelVersion>4.0.0</modelVersion><groupId>{}</groupId><artifactId>app</artifactId></project>",
            group_id
        ),
    )
    .unwrap();
}

pub fn web(kind: &str, path: &str) -> Annotation {
    Annotation::new(format!("Lorg/springframework/web/bind/annotation/{};", kind)).with_element(
        "value",
        ElementValue::Array(vec![ElementValue::Const(path.to_string())]),
    )
}

pub fn dubbo_service() -> Annotation {
    Annotation::new("Lorg/apache/dubbo/config/annotation/DubboService;")
}

/// An order module: a controller calling an interface with two implementations,
/// an RPC facade and a repository.
pub fn order_module(root: &Path) {
    write_pom(root, "com.acme");

    write_class(
        root,
        "com/acme/web/OrderController",
        ClassFileWriter::new("com/acme/web/OrderController")
            .annotation(web("RequestMapping", "/orders"))
            .method(MethodSpec::new("<init>", "()V").calls(
                InvokeKind::Special,
                "java/lang/Object",
                "<init>",
                "()V",
            ))
            .method(
                MethodSpec::new("create", "(Ljava/lang/String;)V")
                    .annotation(web("PostMapping", "/create"))
                    .calls(
                        InvokeKind::Static,
                        "java/util/Objects",
                        "requireNonNull",
                        "(Ljava/lang/Object;)Ljava/lang/Object;",
                    )
                    .calls(
                        InvokeKind::Interface,
                        "com/acme/api/OrderApi",
                        "submit",
                        "(Ljava/lang/String;)V",
                    ),
            )
            .method(MethodSpec::new("ping", "()V").annotation(web("GetMapping", "/ping"))),
    );

    write_class(
        root,
        "com/acme/api/OrderApi",
        ClassFileWriter::interface("com/acme/api/OrderApi")
            .method(MethodSpec::abstract_method("submit", "(Ljava/lang/String;)V")),
    );

    write_class(
        root,
        "com/acme/svc/ServiceA",
        ClassFileWriter::new("com/acme/svc/ServiceA")
            .implements("com/acme/api/OrderApi")
            .method(
                MethodSpec::new("submit", "(Ljava/lang/String;)V")
                    .calls(InvokeKind::Virtual, "com/acme/repo/Repo", "save", "()V"),
            )
            .method(MethodSpec::new("submit", "(I)V")),
    );

    write_class(
        root,
        "com/acme/svc/ServiceB",
        ClassFileWriter::new("com/acme/svc/ServiceB")
            .implements("com/acme/api/OrderApi")
            .method(MethodSpec::new("submit", "(Ljava/lang/String;)V")),
    );

    write_class(
        root,
        "com/acme/repo/Repo",
        ClassFileWriter::new("com/acme/repo/Repo").method(MethodSpec::new("save", "()V")),
    );

    write_class(
        root,
        "com/acme/rpc/OrderRpcImpl",
        ClassFileWriter::new("com/acme/rpc/OrderRpcImpl")
            .annotation(dubbo_service())
            .method(MethodSpec::new("<init>", "()V"))
            .method(
                MethodSpec::new("find", "(J)V")
                    .calls(InvokeKind::Virtual, "com/acme/repo/Repo", "save", "()V"),
            )
            .method(
                MethodSpec::new("helper", "()V")
                    .access(0x0001 | 0x0008)
                    .calls(InvokeKind::Virtual, "com/acme/repo/Repo", "save", "()V"),
            ),
    );
}
