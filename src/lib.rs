#![forbid(unsafe_code)]

//! Library behind the `ytscript` binary.
//!
//! Three operations, each a plain function call: rank a keyword search by
//! views ([`youtube::search`]), read comment lines from a sheet
//! ([`sheets::load_comments`]) and render the automation script
//! ([`script::generate`]). The caller sequences them and owns every value in
//! between; nothing is kept across calls.

pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod script;
pub mod security;
pub mod sheets;
pub mod youtube;
