//! Inspector service model
//!
//! The in-memory core of the mock: entities, the filter evaluator and the
//! per-region backend that stores entities and answers listings.
//!
//! # Module Structure
//!
//! - [`ids`] - Random ids and ARN construction
//! - [`error`] - Client error kinds and their wire codes
//! - [`models`] - Resource groups, targets, templates, runs and findings
//! - [`filter`] - Declarative filter tables and the generic evaluator
//! - [`catalog`] - Embedded static data (regions, rules packages)
//! - [`backend`] - Per-region store and operations
//!
//! # Example
//!
//! ```
//! use inspector_mock::inspector::InspectorBackend;
//!
//! let mut backend = InspectorBackend::new("us-east-1", "123456789012");
//! let target_arn = backend.create_assessment_target("web", None).arn.clone();
//! assert_eq!(backend.list_assessment_targets(None).unwrap(), vec![target_arn]);
//! ```

pub mod backend;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod ids;
pub mod models;

pub use backend::{InspectorBackend, TagEntry};
pub use error::{InspectorError, Result};
pub use filter::Filter;
