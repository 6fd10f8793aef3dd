// Call-graph extraction over compiled JVM classes, rooted at HTTP and RPC entry points.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;
