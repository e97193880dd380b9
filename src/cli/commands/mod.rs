//! CLI command implementations

pub mod completions;
pub mod entity;
pub mod form;
pub mod init;
pub mod status;
