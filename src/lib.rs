//! LanShare Server Library
//!
//! Local network file sharing: list a browse root, download a file or a
//! directory zipped on the fly, and upload files into an inbox directory.
//! The server binary is in main.rs.
//!
//! # Modules
//!
//! - `paths`: Runtime registry of the browse, download and upload paths
//! - `index`: Recursive directory listing for `/browse`
//! - `archive`: Temporary zip / tar.gz archives of a directory
//! - `transfer`: Streaming downloads and multipart uploads
//! - `signal`: Process-wide at-most-once failure signal
//! - `server`: Listener lifecycle and graceful shutdown

pub mod archive;
pub mod config;
pub mod error;
pub mod html;
pub mod index;
pub mod paths;
pub mod routes;
pub mod server;
pub mod signal;
pub mod state;
pub mod transfer;
