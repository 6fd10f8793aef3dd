//! Instruction walk over a `Code` attribute, collecting method invocations.

use super::bootstrap::BootstrapMethods;
use super::constant_pool::ConstantPool;
use super::parser::{read_i32_at, Parser, Result};
use crate::error::malformed_error;

pub const INVOKEVIRTUAL: u8 = 0xb6;
pub const INVOKESPECIAL: u8 = 0xb7;
pub const INVOKESTATIC: u8 = 0xb8;
pub const INVOKEINTERFACE: u8 = 0xb9;
pub const INVOKEDYNAMIC: u8 = 0xba;
pub const TABLESWITCH: u8 = 0xaa;
pub const LOOKUPSWITCH: u8 = 0xab;
pub const WIDE: u8 = 0xc4;
pub const IINC: u8 = 0x84;
pub const RETURN: u8 = 0xb1;

/// Call opcode classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeKind {
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            INVOKEVIRTUAL => Some(InvokeKind::Virtual),
            INVOKESPECIAL => Some(InvokeKind::Special),
            INVOKESTATIC => Some(InvokeKind::Static),
            INVOKEINTERFACE => Some(InvokeKind::Interface),
            _ => None,
        }
    }

    /// Invocation behind a `MethodHandle` reference kind. Field and constructor
    /// handles map to `None`, except `newInvokeSpecial` which runs `<init>`.
    pub fn from_reference_kind(kind: u8) -> Option<Self> {
        match kind {
            5 => Some(InvokeKind::Virtual),
            6 => Some(InvokeKind::Static),
            7 | 8 => Some(InvokeKind::Special),
            9 => Some(InvokeKind::Interface),
            _ => None,
        }
    }

    /// Reference kind of a handle invoking a method this way.
    pub fn reference_kind(&self) -> u8 {
        match self {
            InvokeKind::Virtual => 5,
            InvokeKind::Static => 6,
            InvokeKind::Special => 7,
            InvokeKind::Interface => 9,
        }
    }

    pub fn opcode(&self) -> u8 {
        match self {
            InvokeKind::Virtual => INVOKEVIRTUAL,
            InvokeKind::Special => INVOKESPECIAL,
            InvokeKind::Static => INVOKESTATIC,
            InvokeKind::Interface => INVOKEINTERFACE,
        }
    }
}

/// A call site found in a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvokeKind,
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub offset: usize,
}

/// The parts of a `Code` attribute the reader needs.
#[derive(Debug, Clone)]
pub struct CodeBody<'a> {
    pub code: &'a [u8],
}

impl<'a> CodeBody<'a> {
    /// Parse a `Code` attribute body. Exception table and nested attributes are skipped.
    pub fn parse(parser: &mut Parser<'a>) -> Result<Self> {
        parser.advance_by(4)?; // max_stack, max_locals
        let code_length = parser.read_u32()? as usize;
        let code = parser.read_bytes(code_length)?;
        let handlers = parser.read_u16()? as usize;
        parser.advance_by(handlers * 8)?;
        let attributes = parser.read_u16()?;
        for _ in 0..attributes {
            parser.advance_by(2)?;
            let len = parser.read_u32()? as usize;
            parser.advance_by(len)?;
        }
        Ok(Self { code })
    }

    /// Invocations in instruction order.
    ///
    /// An `invokedynamic` bootstrapped by `LambdaMetafactory` counts as a call to
    /// the lambda's implementation method.
    pub fn invocations(
        &self,
        pool: &ConstantPool,
        bootstrap: &BootstrapMethods,
    ) -> Result<Vec<Invocation>> {
        let mut calls = Vec::new();
        let mut pc = 0;
        while pc < self.code.len() {
            let opcode = self.code[pc];
            let len = instruction_length(self.code, pc)?;
            let index = || u16::from_be_bytes([self.code[pc + 1], self.code[pc + 2]]);
            let target = match InvokeKind::from_opcode(opcode) {
                Some(kind) => Some((kind, pool.method_ref(index())?)),
                None if opcode == INVOKEDYNAMIC => bootstrap.lambda_target(pool, index())?,
                None => None,
            };
            if let Some((kind, member)) = target {
                calls.push(Invocation {
                    kind,
                    owner: member.owner.to_string(),
                    name: member.name.to_string(),
                    descriptor: member.descriptor.to_string(),
                    offset: pc,
                });
            }
            pc += len;
        }
        Ok(calls)
    }
}

/// Total length in bytes of the instruction starting at `pc`, operands included.
pub fn instruction_length(code: &[u8], pc: usize) -> Result<usize> {
    let opcode = code[pc];
    let len = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13 | 0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        IINC => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,
        TABLESWITCH => {
            let base = pc + 1 + padding(pc);
            let low = read_i32_at(code, base + 4)?;
            let high = read_i32_at(code, base + 8)?;
            if high < low {
                return Err(malformed_error!("tableswitch at {} has high < low", pc));
            }
            let entries = (high as i64 - low as i64 + 1) as usize;
            base + 12 + entries * 4 - pc
        }
        LOOKUPSWITCH => {
            let base = pc + 1 + padding(pc);
            let pairs = read_i32_at(code, base + 4)?;
            if pairs < 0 {
                return Err(malformed_error!("lookupswitch at {} has negative pair count", pc));
            }
            base + 8 + pairs as usize * 8 - pc
        }
        0xac..=RETURN => 1,
        0xb2..=INVOKESTATIC => 3,
        INVOKEINTERFACE | INVOKEDYNAMIC => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,
        WIDE => match code.get(pc + 1) {
            Some(&IINC) => 6,
            Some(_) => 4,
            None => return Err(malformed_error!("truncated wide instruction at {}", pc)),
        },
        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        0xca | 0xfe | 0xff => 1,
        other => return Err(malformed_error!("unknown opcode {:#04x} at {}", other, pc)),
    };
    if pc + len > code.len() {
        return Err(malformed_error!(
            "instruction {:#04x} at {} runs past the end of the code",
            opcode,
            pc
        ));
    }
    Ok(len)
}

/// Alignment bytes after a switch opcode so its operands start on a 4-byte boundary.
pub fn padding(pc: usize) -> usize {
    (4 - (pc + 1) % 4) % 4
}
