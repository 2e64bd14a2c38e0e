//! inspector-mock
//!
//! An in-memory stand-in for the Amazon Inspector (classic) API, served over
//! the AWS JSON 1.1 protocol so unmodified SDK clients can point at it.

pub mod config;
pub mod inspector;
pub mod server;
pub mod service;
