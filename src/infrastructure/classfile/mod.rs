//! JVM class file decoding.

pub mod annotation;
pub mod bootstrap;
pub mod bytecode;
pub mod constant_pool;
pub mod parser;
pub mod reader;
pub mod writer;

pub use reader::{parse_class, ClassFileReader, ParsedClass};
pub use writer::{ClassFileWriter, Instruction, MethodSpec};
