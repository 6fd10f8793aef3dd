// Adapters behind the ports: class file reading, scanning, build descriptors and output.

pub mod classfile;
pub mod concurrency;
pub mod config;
pub mod exclusion;
pub mod export;
pub mod git_diff;
pub mod pom;
pub mod scanner;
