// Annotation values as recovered from class-file attributes.

/// A single annotation occurrence on a class or method.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field descriptor of the annotation type, e.g. `Lorg/acme/Mapping;`.
    pub type_descriptor: String,
    pub elements: Vec<(String, ElementValue)>,
}

/// Element value of an annotation, mirroring the class-file `element_value` union.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    /// Primitive or string constant, rendered as text.
    Const(String),
    Enum { type_descriptor: String, const_name: String },
    Class(String),
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl Annotation {
    pub fn new(type_descriptor: impl Into<String>) -> Self {
        Self {
            type_descriptor: type_descriptor.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.elements.push((name.into(), value));
        self
    }

    pub fn is(&self, type_descriptor: &str) -> bool {
        self.type_descriptor == type_descriptor
    }

    pub fn element(&self, name: &str) -> Option<&ElementValue> {
        self.elements
            .iter()
            .find(|(element, _)| element == name)
            .map(|(_, value)| value)
    }

    /// String constants of an element, flattening a single value and arrays alike.
    pub fn strings(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(value) = self.element(name) {
            value.collect_strings(&mut out);
        }
        out
    }

    /// Enum constant names of an element, flattening arrays.
    pub fn enum_names(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(value) = self.element(name) {
            value.collect_enum_names(&mut out);
        }
        out
    }
}

impl ElementValue {
    fn collect_strings(&self, out: &mut Vec<String>) {
        match self {
            ElementValue::Const(value) => out.push(value.clone()),
            ElementValue::Array(values) => values.iter().for_each(|v| v.collect_strings(out)),
            _ => {}
        }
    }

    fn collect_enum_names(&self, out: &mut Vec<String>) {
        match self {
            ElementValue::Enum { const_name, .. } => out.push(const_name.clone()),
            ElementValue::Array(values) => values.iter().for_each(|v| v.collect_enum_names(out)),
            _ => {}
        }
    }
}
