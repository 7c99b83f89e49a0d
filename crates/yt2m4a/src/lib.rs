//! yt2m4a - web front end and CLI for the yt2m4a core library
//!
//! - `cli`: command-line arguments
//! - `web_server`: axum router, handlers, and server startup

pub mod cli;
pub mod web_server;
