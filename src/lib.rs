//! wirehttp - minimal HTTP/1.1 over raw TCP
//!
//! Core library: request parsing, response framing and the per-connection glue.

pub mod config;
pub mod http;
pub mod server;
