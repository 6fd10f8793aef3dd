//! Cursor-based, bounds-checked reader over big-endian class file data.

use crate::error::ClassFileError;

pub type Result<T> = std::result::Result<T, ClassFileError>;

/// Sequential reader over a byte slice. Every read is bounds checked.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(ClassFileError::OutOfBounds {
                offset: position,
                len: 0,
                available: self.data.len(),
            });
        }
        self.position = position;
        Ok(())
    }

    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.read_bytes(step).map(|_| ())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(ClassFileError::OutOfBounds {
                offset: self.position,
                len,
                available: self.data.len(),
            })?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Split off the next `len` bytes as an independent parser.
    pub fn sub_parser(&mut self, len: usize) -> Result<Parser<'a>> {
        self.read_bytes(len).map(Parser::new)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_u32().map(|v| v as i32)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let hi = self.read_u32()? as u64;
        let lo = self.read_u32()? as u64;
        Ok((hi << 32) | lo)
    }
}

/// Read a big-endian `i32` at an absolute offset without a cursor.
pub fn read_i32_at(data: &[u8], offset: usize) -> Result<i32> {
    let mut parser = Parser::new(data);
    parser.seek(offset)?;
    parser.read_i32()
}
