//! Service plumbing between the HTTP front end and the backends
//!
//! - [`regions`] - One locked backend per served region
//! - [`dispatch`] - Action name and wire parameters to backend calls

pub mod dispatch;
pub mod regions;
