/// Call trees over classes produced by javac (sources under `fixtures/javac/java`).
///
/// These cover shapes the synthetic writer only produces on request: bridge
/// methods for generic interfaces, lambda bodies, method references and
/// string-concatenation call sites.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use common::write_pom;
use invoke_link::application::InvokeLinkService;
use invoke_link::domain::callgraph::{CallNode, EntryForest};
use invoke_link::infrastructure::classfile::parse_class;
use tempfile::{tempdir, TempDir};
use walkdir::WalkDir;

const CONTROLLER: &str = "com/acme/UserController";

fn fixture_classes() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/javac/classes")
}

/// The compiled fixture copied under a `com.acme` pom, so callees are limited to the module.
fn module_root() -> TempDir {
    let dir = tempdir().unwrap();
    let source = fixture_classes();
    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    write_pom(dir.path(), "com.acme");
    dir
}

fn scan(root: &Path) -> EntryForest {
    InvokeLinkService::default()
        .method_invoke_links(&[root], &[])
        .unwrap()
}

fn root<'a>(forest: &'a EntryForest, method: &str) -> &'a CallNode {
    let signature = format!("{}#{}", CONTROLLER, method);
    forest
        .http
        .iter()
        .find(|n| n.signature == signature)
        .unwrap_or_else(|| panic!("no HTTP entry {}", signature))
}

fn children(node: &CallNode) -> Vec<&str> {
    node.children.iter().map(|n| n.signature.as_str()).collect()
}

#[test]
fn test_controller_entries() {
    let dir = module_root();
    let forest = scan(dir.path());

    let entries: Vec<_> = forest.http.iter().map(|n| n.signature.as_str()).collect();
    assert_eq!(
        entries,
        vec![
            "com/acme/UserController#get(Ljava/lang/Long;)",
            "com/acme/UserController#greet(Ljava/lang/String;)",
            "com/acme/UserController#one(Ljava/lang/Long;)",
            "com/acme/UserController#ref(Ljava/lang/Long;)",
            "com/acme/UserController#save(Lcom/acme/User;)",
        ]
    );
    assert_eq!(root(&forest, "get(Ljava/lang/Long;)").mapping_path.as_deref(), Some("/users/get"));
    assert!(forest.rpc.is_empty());
}

#[test]
fn test_covariant_bridge_keeps_service_edges() {
    let dir = module_root();
    let forest = scan(dir.path());

    let get = root(&forest, "get(Ljava/lang/Long;)");
    assert_eq!(children(get), vec!["com/acme/BaseService#findById(Ljava/lang/Long;)"]);
    let dispatch = &get.children[0];
    assert!(dispatch.is_abstract);
    assert_eq!(children(dispatch), vec!["com/acme/UserService#findById(Ljava/lang/Long;)"]);
    assert_eq!(
        children(&dispatch.children[0]),
        vec!["com/acme/UserRepo#load(Ljava/lang/Long;)"]
    );
}

#[test]
fn test_erased_parameter_bridge_reaches_real_method() {
    let dir = module_root();
    let forest = scan(dir.path());

    let save = root(&forest, "save(Lcom/acme/User;)");
    let store = save
        .find("com/acme/UserService#save(Ljava/lang/Object;)")
        .and_then(|bridge| bridge.find("com/acme/UserService#save(Lcom/acme/User;)"))
        .and_then(|real| real.find("com/acme/UserRepo#store(Lcom/acme/User;)"));
    assert!(store.is_some(), "save tree lost the repository edge: {:#?}", save);
}

#[test]
fn test_lambda_body_is_reachable() {
    let dir = module_root();
    let forest = scan(dir.path());

    let one = root(&forest, "one(Ljava/lang/Long;)");
    assert_eq!(children(one), vec!["com/acme/UserController#lambda$one$0(Ljava/lang/Long;)"]);
    assert_eq!(
        children(&one.children[0]),
        vec!["com/acme/UserRepo#load(Ljava/lang/Long;)"]
    );
}

#[test]
fn test_method_reference_links_directly() {
    let dir = module_root();
    let forest = scan(dir.path());

    let by_reference = root(&forest, "ref(Ljava/lang/Long;)");
    assert_eq!(children(by_reference), vec!["com/acme/UserRepo#load(Ljava/lang/Long;)"]);
}

#[test]
fn test_string_concatenation_is_not_a_call() {
    let dir = module_root();
    let forest = scan(dir.path());

    assert!(root(&forest, "greet(Ljava/lang/String;)").is_leaf());
}

#[test]
fn test_without_namespace_library_calls_stay_leaves() {
    let forest = scan(&fixture_classes());

    let one = root(&forest, "one(Ljava/lang/Long;)");
    let lambda = one
        .find("com/acme/UserController#lambda$one$0(Ljava/lang/Long;)")
        .unwrap();
    assert!(lambda.find("com/acme/UserRepo#load(Ljava/lang/Long;)").is_some());

    let optional = one.find("java/util/Optional#of(Ljava/lang/Object;)").unwrap();
    assert!(optional.is_leaf());
}

#[test]
fn test_service_class_records() {
    let bytes = fs::read(fixture_classes().join("com/acme/UserService.class")).unwrap();
    let parsed = parse_class(&bytes, Some("com/acme")).unwrap();

    assert_eq!(parsed.class.interfaces, vec!["com/acme/BaseService"]);
    let signatures: Vec<_> = parsed.methods.iter().map(|m| m.signature.as_str()).collect();
    assert_eq!(
        signatures,
        vec![
            "com/acme/UserService#<init>()",
            "com/acme/UserService#findById(Ljava/lang/Long;)",
            "com/acme/UserService#save(Lcom/acme/User;)",
            "com/acme/UserService#save(Ljava/lang/Object;)",
        ]
    );
}
