//! ziggy: form-to-entity mapping engine
//!
//! Maps declarative forms onto a relational entity graph: stored entities
//! pre-fill a form on load, and a filled form is split into entities and
//! persisted parents-first on save.

pub mod cli;
pub mod core;
pub mod mapper;

pub use mapper::{FormModelMapper, SaveReport};
