//! Class file constant pool.

use super::parser::{Parser, Result};
use crate::error::{malformed_error, ClassFileError};

pub const TAG_UTF8: u8 = 1;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_FLOAT: u8 = 4;
pub const TAG_LONG: u8 = 5;
pub const TAG_DOUBLE: u8 = 6;
pub const TAG_CLASS: u8 = 7;
pub const TAG_STRING: u8 = 8;
pub const TAG_FIELDREF: u8 = 9;
pub const TAG_METHODREF: u8 = 10;
pub const TAG_INTERFACE_METHODREF: u8 = 11;
pub const TAG_NAME_AND_TYPE: u8 = 12;
pub const TAG_METHOD_HANDLE: u8 = 15;
pub const TAG_METHOD_TYPE: u8 = 16;
pub const TAG_DYNAMIC: u8 = 17;
pub const TAG_INVOKE_DYNAMIC: u8 = 18;
pub const TAG_MODULE: u8 = 19;
pub const TAG_PACKAGE: u8 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Index 0 and the second slot of a long or double.
    Unusable,
}

/// A resolved field or method reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub descriptor: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn parse(parser: &mut Parser<'_>) -> Result<Self> {
        let count = parser.read_u16()? as usize;
        if count == 0 {
            return Err(malformed_error!("constant pool count is zero"));
        }

        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);
        while entries.len() < count {
            let tag = parser.read_u8()?;
            let constant = match tag {
                TAG_UTF8 => {
                    let len = parser.read_u16()? as usize;
                    Constant::Utf8(decode_modified_utf8(parser.read_bytes(len)?))
                }
                TAG_INTEGER => Constant::Integer(parser.read_i32()?),
                TAG_FLOAT => Constant::Float(f32::from_bits(parser.read_u32()?)),
                TAG_LONG => Constant::Long(parser.read_u64()? as i64),
                TAG_DOUBLE => Constant::Double(f64::from_bits(parser.read_u64()?)),
                TAG_CLASS => Constant::Class {
                    name_index: parser.read_u16()?,
                },
                TAG_STRING => Constant::String {
                    string_index: parser.read_u16()?,
                },
                TAG_FIELDREF => Constant::FieldRef {
                    class_index: parser.read_u16()?,
                    name_and_type_index: parser.read_u16()?,
                },
                TAG_METHODREF => Constant::MethodRef {
                    class_index: parser.read_u16()?,
                    name_and_type_index: parser.read_u16()?,
                },
                TAG_INTERFACE_METHODREF => Constant::InterfaceMethodRef {
                    class_index: parser.read_u16()?,
                    name_and_type_index: parser.read_u16()?,
                },
                TAG_NAME_AND_TYPE => Constant::NameAndType {
                    name_index: parser.read_u16()?,
                    descriptor_index: parser.read_u16()?,
                },
                TAG_METHOD_HANDLE => Constant::MethodHandle {
                    kind: parser.read_u8()?,
                    reference_index: parser.read_u16()?,
                },
                TAG_METHOD_TYPE => Constant::MethodType {
                    descriptor_index: parser.read_u16()?,
                },
                TAG_DYNAMIC => Constant::Dynamic {
                    bootstrap_index: parser.read_u16()?,
                    name_and_type_index: parser.read_u16()?,
                },
                TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                    bootstrap_index: parser.read_u16()?,
                    name_and_type_index: parser.read_u16()?,
                },
                TAG_MODULE => Constant::Module {
                    name_index: parser.read_u16()?,
                },
                TAG_PACKAGE => Constant::Package {
                    name_index: parser.read_u16()?,
                },
                other => {
                    return Err(malformed_error!(
                        "unknown constant tag {} at entry {}",
                        other,
                        entries.len()
                    ))
                }
            };
            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }
        if entries.len() > count {
            return Err(malformed_error!("long or double occupies the last constant pool slot"));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Ok(value),
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => self.utf8(*name_index),
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "Class",
            }),
        }
    }

    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str)> {
        match self.get(index) {
            Some(Constant::NameAndType {
                name_index,
                descriptor_index,
            }) => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "NameAndType",
            }),
        }
    }

    /// Resolve a `Methodref` or `InterfaceMethodref`.
    pub fn method_ref(&self, index: u16) -> Result<MemberRef<'_>> {
        match self.get(index) {
            Some(Constant::MethodRef {
                class_index,
                name_and_type_index,
            })
            | Some(Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            }) => {
                let owner = self.class_name(*class_index)?;
                let (name, descriptor) = self.name_and_type(*name_and_type_index)?;
                Ok(MemberRef {
                    owner,
                    name,
                    descriptor,
                })
            }
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "Methodref or InterfaceMethodref",
            }),
        }
    }

    /// Reference kind and target index of a `MethodHandle`.
    pub fn method_handle(&self, index: u16) -> Result<(u8, u16)> {
        match self.get(index) {
            Some(Constant::MethodHandle {
                kind,
                reference_index,
            }) => Ok((*kind, *reference_index)),
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "MethodHandle",
            }),
        }
    }

    /// Bootstrap method slot of an `InvokeDynamic` call site.
    pub fn invoke_dynamic(&self, index: u16) -> Result<u16> {
        match self.get(index) {
            Some(Constant::InvokeDynamic {
                bootstrap_index, ..
            }) => Ok(*bootstrap_index),
            _ => Err(ClassFileError::InvalidConstant {
                index,
                expected: "InvokeDynamic",
            }),
        }
    }

    /// Render a loadable constant as text, as used by annotation element values.
    pub fn constant_text(&self, index: u16, tag: u8) -> Result<String> {
        let text = match (tag, self.get(index)) {
            (b'Z', Some(Constant::Integer(v))) => (*v != 0).to_string(),
            (b'C', Some(Constant::Integer(v))) => char::from_u32(*v as u32)
                .map(String::from)
                .unwrap_or_default(),
            (_, Some(Constant::Integer(v))) => v.to_string(),
            (_, Some(Constant::Long(v))) => v.to_string(),
            (_, Some(Constant::Float(v))) => v.to_string(),
            (_, Some(Constant::Double(v))) => v.to_string(),
            (_, Some(Constant::Utf8(v))) => v.clone(),
            _ => {
                return Err(ClassFileError::InvalidConstant {
                    index,
                    expected: "constant value",
                })
            }
        };
        Ok(text)
    }
}

/// Decode the JVM's modified UTF-8 (2-byte NUL, surrogate pairs as two 3-byte units).
pub fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(plain) = std::str::from_utf8(bytes) {
        return plain.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push((((b & 0x1F) as u16) << 6) | (bytes[i + 1] & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(
                (((b & 0x0F) as u16) << 12)
                    | (((bytes[i + 1] & 0x3F) as u16) << 6)
                    | (bytes[i + 2] & 0x3F) as u16,
            );
            i += 3;
        } else {
            units.push(char::REPLACEMENT_CHARACTER as u16);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}
