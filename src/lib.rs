//! Source-to-source instrumentation for Rust.
//!
//! A run parses one file, keeps only directive comments, brackets every
//! function body with entry/exit probe calls, and prints the result.

pub mod comments;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod position;
pub mod print;
pub mod rewrite;
