//! `RuntimeVisibleAnnotations` / `RuntimeInvisibleAnnotations` decoding.

use super::constant_pool::ConstantPool;
use super::parser::{Parser, Result};
use crate::domain::annotation::{Annotation, ElementValue};
use crate::error::malformed_error;

pub const RUNTIME_VISIBLE: &str = "RuntimeVisibleAnnotations";
pub const RUNTIME_INVISIBLE: &str = "RuntimeInvisibleAnnotations";

/// Nested annotations deeper than this are treated as malformed.
const MAX_NESTING: usize = 64;

pub fn is_annotation_attribute(name: &str) -> bool {
    name == RUNTIME_VISIBLE || name == RUNTIME_INVISIBLE
}

/// Parse the body of an annotations attribute.
pub fn parse_annotations(parser: &mut Parser<'_>, pool: &ConstantPool) -> Result<Vec<Annotation>> {
    let count = parser.read_u16()?;
    (0..count)
        .map(|_| parse_annotation(parser, pool, 0))
        .collect()
}

fn parse_annotation(parser: &mut Parser<'_>, pool: &ConstantPool, depth: usize) -> Result<Annotation> {
    if depth > MAX_NESTING {
        return Err(malformed_error!("annotation nesting exceeds {}", MAX_NESTING));
    }
    let type_descriptor = pool.utf8(parser.read_u16()?)?.to_string();
    let pairs = parser.read_u16()?;
    let mut elements = Vec::with_capacity(pairs as usize);
    for _ in 0..pairs {
        let name = pool.utf8(parser.read_u16()?)?.to_string();
        let value = parse_element_value(parser, pool, depth)?;
        elements.push((name, value));
    }
    Ok(Annotation {
        type_descriptor,
        elements,
    })
}

fn parse_element_value(
    parser: &mut Parser<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<ElementValue> {
    let tag = parser.read_u8()?;
    let value = match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
            ElementValue::Const(pool.constant_text(parser.read_u16()?, tag)?)
        }
        b'e' => ElementValue::Enum {
            type_descriptor: pool.utf8(parser.read_u16()?)?.to_string(),
            const_name: pool.utf8(parser.read_u16()?)?.to_string(),
        },
        b'c' => ElementValue::Class(pool.utf8(parser.read_u16()?)?.to_string()),
        b'@' => ElementValue::Annotation(Box::new(parse_annotation(parser, pool, depth + 1)?)),
        b'[' => {
            let count = parser.read_u16()?;
            let values = (0..count)
                .map(|_| parse_element_value(parser, pool, depth + 1))
                .collect::<Result<Vec<_>>>()?;
            ElementValue::Array(values)
        }
        other => return Err(malformed_error!("unknown element value tag {:#04x}", other)),
    };
    Ok(value)
}
