//! Minimal class file emitter.
//!
//! Produces structurally valid class files with annotations, straight-line
//! method bodies and `invokedynamic` call sites. Bodies never branch backwards, so no stack map frames are
//! emitted. Used to synthesize artifacts for tests and benchmarks.

use std::collections::HashMap;

use super::bootstrap::{BOOTSTRAP_METHODS, LAMBDA_METAFACTORY};
use super::bytecode::{
    padding, InvokeKind, INVOKEDYNAMIC, INVOKEINTERFACE, LOOKUPSWITCH, RETURN, TABLESWITCH,
};
use super::constant_pool::{
    TAG_CLASS, TAG_INTERFACE_METHODREF, TAG_INVOKE_DYNAMIC, TAG_METHODREF, TAG_METHOD_HANDLE,
    TAG_METHOD_TYPE, TAG_NAME_AND_TYPE, TAG_STRING, TAG_UTF8,
};
use super::reader::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, MAGIC};
use crate::domain::annotation::{Annotation, ElementValue};
use crate::domain::method::parse_parameter_descriptors;

const DEFAULT_MAJOR_VERSION: u16 = 52;
const BOOTSTRAP_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
const METAFACTORY_DESCRIPTOR: &str = "(Ljava/lang/invoke/MethodHandles$Lookup;Ljava/lang/String;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodType;Ljava/lang/invoke/MethodHandle;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/CallSite;";
const ERASED_FUNCTION: &str = "(Ljava/lang/Object;)Ljava/lang/Object;";
const REF_INVOKE_STATIC: u8 = 6;

/// One instruction of a synthesized method body.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Invoke {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    /// A `java.util.function.Function` created by `LambdaMetafactory` over the given method.
    Lambda {
        kind: InvokeKind,
        owner: String,
        name: String,
        descriptor: String,
    },
    /// An `invokedynamic` bootstrapped by some other static method, without static arguments.
    Dynamic {
        bootstrap_owner: String,
        bootstrap_name: String,
    },
    /// `ldc` / `ldc_w` of a string constant.
    LoadString(String),
    /// A `tableswitch` whose every target falls through to the next instruction.
    TableSwitch { low: i32, high: i32 },
    /// A `lookupswitch` whose every target falls through to the next instruction.
    LookupSwitch { keys: Vec<i32> },
    /// Opcodes that reference neither the constant pool nor a branch target.
    Raw(Vec<u8>),
}

impl Instruction {
    pub fn invoke(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Self {
        Instruction::Invoke {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }

    pub fn lambda(kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Self {
        Instruction::Lambda {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    descriptor: String,
    access_flags: u16,
    annotations: Vec<Annotation>,
    body: Option<Vec<Instruction>>,
}

impl MethodSpec {
    /// A public method with an empty body.
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access_flags: ACC_PUBLIC,
            annotations: Vec::new(),
            body: Some(Vec::new()),
        }
    }

    /// A public abstract method without a `Code` attribute.
    pub fn abstract_method(name: &str, descriptor: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_ABSTRACT,
            body: None,
            ..Self::new(name, descriptor)
        }
    }

    pub fn access(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.body.get_or_insert_with(Vec::new).push(instruction);
        self
    }

    pub fn calls(self, kind: InvokeKind, owner: &str, name: &str, descriptor: &str) -> Self {
        self.instruction(Instruction::invoke(kind, owner, name, descriptor))
    }
}

/// Builder for a single class file.
#[derive(Debug, Clone)]
pub struct ClassFileWriter {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    access_flags: u16,
    major_version: u16,
    annotations: Vec<Annotation>,
    methods: Vec<MethodSpec>,
}

impl ClassFileWriter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            access_flags: ACC_PUBLIC,
            major_version: DEFAULT_MAJOR_VERSION,
            annotations: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// A public interface extending `java/lang/Object`.
    pub fn interface(name: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT,
            ..Self::new(name)
        }
    }

    pub fn super_class(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn major_version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let this_index = pool.class(&self.name);
        let super_index = self.super_name.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interface_indices: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let mut methods = Vec::new();
        put_u16(&mut methods, self.methods.len() as u16);
        for method in &self.methods {
            write_method(&mut methods, &mut pool, method);
        }

        let mut attributes = Vec::new();
        let attribute_count =
            !self.annotations.is_empty() as u16 + !pool.bootstraps.is_empty() as u16;
        put_u16(&mut attributes, attribute_count);
        if !self.annotations.is_empty() {
            write_annotations_attribute(&mut attributes, &mut pool, &self.annotations);
        }
        if !pool.bootstraps.is_empty() {
            write_bootstrap_attribute(&mut attributes, &mut pool);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        put_u16(&mut out, 0);
        put_u16(&mut out, self.major_version);
        pool.write(&mut out);
        put_u16(&mut out, self.access_flags);
        put_u16(&mut out, this_index);
        put_u16(&mut out, super_index);
        put_u16(&mut out, interface_indices.len() as u16);
        for index in interface_indices {
            put_u16(&mut out, index);
        }
        put_u16(&mut out, 0); // fields
        out.extend_from_slice(&methods);
        out.extend_from_slice(&attributes);
        out
    }
}

fn write_method(out: &mut Vec<u8>, pool: &mut PoolBuilder, method: &MethodSpec) {
    put_u16(out, method.access_flags);
    put_u16(out, pool.utf8(&method.name));
    put_u16(out, pool.utf8(&method.descriptor));

    let attribute_count = method.body.is_some() as u16 + !method.annotations.is_empty() as u16;
    put_u16(out, attribute_count);

    if let Some(body) = &method.body {
        let code = assemble(pool, body);
        let slots: usize = parse_parameter_descriptors(&method.descriptor)
            .iter()
            .map(|p| if p == "J" || p == "D" { 2 } else { 1 })
            .sum();

        let mut attr = Vec::new();
        put_u16(&mut attr, 16); // max_stack
        put_u16(&mut attr, (slots + 1) as u16); // max_locals
        attr.extend_from_slice(&(code.len() as u32).to_be_bytes());
        attr.extend_from_slice(&code);
        put_u16(&mut attr, 0); // exception table
        put_u16(&mut attr, 0); // attributes

        put_u16(out, pool.utf8("Code"));
        out.extend_from_slice(&(attr.len() as u32).to_be_bytes());
        out.extend_from_slice(&attr);
    }
    if !method.annotations.is_empty() {
        write_annotations_attribute(out, pool, &method.annotations);
    }
}

fn assemble(pool: &mut PoolBuilder, body: &[Instruction]) -> Vec<u8> {
    let mut code = Vec::new();
    for instruction in body {
        let pc = code.len();
        match instruction {
            Instruction::Invoke {
                kind,
                owner,
                name,
                descriptor,
            } => {
                let interface = *kind == InvokeKind::Interface;
                let index = pool.method_ref(owner, name, descriptor, interface);
                code.push(kind.opcode());
                put_u16(&mut code, index);
                if kind.opcode() == INVOKEINTERFACE {
                    let slots: usize = parse_parameter_descriptors(descriptor)
                        .iter()
                        .map(|p| if p == "J" || p == "D" { 2 } else { 1 })
                        .sum();
                    code.push((slots + 1) as u8);
                    code.push(0);
                }
            }
            Instruction::Lambda {
                kind,
                owner,
                name,
                descriptor,
            } => {
                let target = pool.method_ref(owner, name, descriptor, *kind == InvokeKind::Interface);
                let implementation = pool.method_handle(kind.reference_kind(), target);
                let erased = pool.method_type(ERASED_FUNCTION);
                let instantiated = pool.method_type(descriptor);
                let factory =
                    pool.method_ref(LAMBDA_METAFACTORY, "metafactory", METAFACTORY_DESCRIPTOR, false);
                let factory = pool.method_handle(REF_INVOKE_STATIC, factory);
                let slot = pool.bootstrap(factory, vec![erased, implementation, instantiated]);
                let site = pool.invoke_dynamic(slot, "apply", "()Ljava/util/function/Function;");
                code.push(INVOKEDYNAMIC);
                put_u16(&mut code, site);
                put_u16(&mut code, 0);
            }
            Instruction::Dynamic {
                bootstrap_owner,
                bootstrap_name,
            } => {
                let factory =
                    pool.method_ref(bootstrap_owner, bootstrap_name, BOOTSTRAP_DESCRIPTOR, false);
                let factory = pool.method_handle(REF_INVOKE_STATIC, factory);
                let slot = pool.bootstrap(factory, Vec::new());
                let site = pool.invoke_dynamic(slot, "run", "()V");
                code.push(INVOKEDYNAMIC);
                put_u16(&mut code, site);
                put_u16(&mut code, 0);
            }
            Instruction::LoadString(value) => {
                let index = pool.string(value);
                if index <= u8::MAX as u16 {
                    code.extend_from_slice(&[0x12, index as u8]);
                } else {
                    code.push(0x13);
                    put_u16(&mut code, index);
                }
            }
            Instruction::TableSwitch { low, high } => {
                let entries = (*high - *low + 1).max(0) as usize;
                let size = 1 + padding(pc) + 12 + entries * 4;
                code.push(TABLESWITCH);
                code.extend(std::iter::repeat(0).take(padding(pc)));
                let fallthrough = size as i32;
                code.extend_from_slice(&fallthrough.to_be_bytes());
                code.extend_from_slice(&low.to_be_bytes());
                code.extend_from_slice(&high.to_be_bytes());
                for _ in 0..entries {
                    code.extend_from_slice(&fallthrough.to_be_bytes());
                }
            }
            Instruction::LookupSwitch { keys } => {
                let size = 1 + padding(pc) + 8 + keys.len() * 8;
                code.push(LOOKUPSWITCH);
                code.extend(std::iter::repeat(0).take(padding(pc)));
                let fallthrough = size as i32;
                code.extend_from_slice(&fallthrough.to_be_bytes());
                code.extend_from_slice(&(keys.len() as i32).to_be_bytes());
                let mut sorted = keys.clone();
                sorted.sort_unstable();
                for key in sorted {
                    code.extend_from_slice(&key.to_be_bytes());
                    code.extend_from_slice(&fallthrough.to_be_bytes());
                }
            }
            Instruction::Raw(bytes) => code.extend_from_slice(bytes),
        }
    }
    code.push(RETURN);
    code
}

fn write_bootstrap_attribute(out: &mut Vec<u8>, pool: &mut PoolBuilder) {
    let mut body = Vec::new();
    put_u16(&mut body, pool.bootstraps.len() as u16);
    for (method_ref, arguments) in &pool.bootstraps {
        put_u16(&mut body, *method_ref);
        put_u16(&mut body, arguments.len() as u16);
        for argument in arguments {
            put_u16(&mut body, *argument);
        }
    }
    put_u16(out, pool.utf8(BOOTSTRAP_METHODS));
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
}

fn write_annotations_attribute(out: &mut Vec<u8>, pool: &mut PoolBuilder, annotations: &[Annotation]) {
    let mut body = Vec::new();
    put_u16(&mut body, annotations.len() as u16);
    for annotation in annotations {
        write_annotation(&mut body, pool, annotation);
    }
    put_u16(out, pool.utf8("RuntimeVisibleAnnotations"));
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
}

fn write_annotation(out: &mut Vec<u8>, pool: &mut PoolBuilder, annotation: &Annotation) {
    put_u16(out, pool.utf8(&annotation.type_descriptor));
    put_u16(out, annotation.elements.len() as u16);
    for (name, value) in &annotation.elements {
        put_u16(out, pool.utf8(name));
        write_element_value(out, pool, value);
    }
}

fn write_element_value(out: &mut Vec<u8>, pool: &mut PoolBuilder, value: &ElementValue) {
    match value {
        ElementValue::Const(text) => {
            out.push(b's');
            put_u16(out, pool.utf8(text));
        }
        ElementValue::Enum {
            type_descriptor,
            const_name,
        } => {
            out.push(b'e');
            put_u16(out, pool.utf8(type_descriptor));
            put_u16(out, pool.utf8(const_name));
        }
        ElementValue::Class(descriptor) => {
            out.push(b'c');
            put_u16(out, pool.utf8(descriptor));
        }
        ElementValue::Annotation(nested) => {
            out.push(b'@');
            write_annotation(out, pool, nested);
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_u16(out, values.len() as u16);
            for v in values {
                write_element_value(out, pool, v);
            }
        }
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Utf8(String),
    Class(u16),
    String(u16),
    NameAndType(u16, u16),
    MethodRef(u16, u16, bool),
    MethodHandle(u8, u16),
    MethodType(u16),
    InvokeDynamic(u16, u16),
}

/// Interning constant pool builder.
#[derive(Debug, Default)]
struct PoolBuilder {
    bytes: Vec<u8>,
    count: u16,
    interned: HashMap<PoolKey, u16>,
    /// `BootstrapMethods` entries: method handle and static arguments.
    bootstraps: Vec<(u16, Vec<u16>)>,
}

impl PoolBuilder {
    fn intern(&mut self, key: PoolKey, encode: impl FnOnce(&mut Vec<u8>)) -> u16 {
        if let Some(index) = self.interned.get(&key) {
            return *index;
        }
        self.count += 1;
        encode(&mut self.bytes);
        self.interned.insert(key, self.count);
        self.count
    }

    fn utf8(&mut self, value: &str) -> u16 {
        self.intern(PoolKey::Utf8(value.to_string()), |out| {
            out.push(TAG_UTF8);
            put_u16(out, value.len() as u16);
            out.extend_from_slice(value.as_bytes());
        })
    }

    fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.intern(PoolKey::Class(name_index), |out| {
            out.push(TAG_CLASS);
            put_u16(out, name_index);
        })
    }

    fn string(&mut self, value: &str) -> u16 {
        let string_index = self.utf8(value);
        self.intern(PoolKey::String(string_index), |out| {
            out.push(TAG_STRING);
            put_u16(out, string_index);
        })
    }

    fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.intern(PoolKey::NameAndType(name_index, descriptor_index), |out| {
            out.push(TAG_NAME_AND_TYPE);
            put_u16(out, name_index);
            put_u16(out, descriptor_index);
        })
    }

    fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> u16 {
        let class_index = self.class(owner);
        let nat_index = self.name_and_type(name, descriptor);
        let tag = if interface {
            TAG_INTERFACE_METHODREF
        } else {
            TAG_METHODREF
        };
        self.intern(PoolKey::MethodRef(class_index, nat_index, interface), |out| {
            out.push(tag);
            put_u16(out, class_index);
            put_u16(out, nat_index);
        })
    }

    fn method_handle(&mut self, kind: u8, reference_index: u16) -> u16 {
        self.intern(PoolKey::MethodHandle(kind, reference_index), |out| {
            out.push(TAG_METHOD_HANDLE);
            out.push(kind);
            put_u16(out, reference_index);
        })
    }

    fn method_type(&mut self, descriptor: &str) -> u16 {
        let descriptor_index = self.utf8(descriptor);
        self.intern(PoolKey::MethodType(descriptor_index), |out| {
            out.push(TAG_METHOD_TYPE);
            put_u16(out, descriptor_index);
        })
    }

    fn invoke_dynamic(&mut self, bootstrap_index: u16, name: &str, descriptor: &str) -> u16 {
        let nat_index = self.name_and_type(name, descriptor);
        self.intern(PoolKey::InvokeDynamic(bootstrap_index, nat_index), |out| {
            out.push(TAG_INVOKE_DYNAMIC);
            put_u16(out, bootstrap_index);
            put_u16(out, nat_index);
        })
    }

    /// Slot of a `BootstrapMethods` entry, reusing an identical one.
    fn bootstrap(&mut self, method_handle: u16, arguments: Vec<u16>) -> u16 {
        let entry = (method_handle, arguments);
        match self.bootstraps.iter().position(|existing| *existing == entry) {
            Some(slot) => slot as u16,
            None => {
                self.bootstraps.push(entry);
                (self.bootstraps.len() - 1) as u16
            }
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u16(out, self.count + 1);
        out.extend_from_slice(&self.bytes);
    }
}
