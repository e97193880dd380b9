//! Form model mapper - maps forms onto the entity graph and back
//!
//! The load path (`load.rs`) turns a form definition plus a stored entity
//! hierarchy into a pre-filled form model. The save path (`save.rs`) groups
//! filled form fields into entity instances, assigns identifiers and
//! persists parents before children.
//!
//! Collaborators are injected: the repository and id factory are owned by
//! the mapper, the entity graph is passed per call because it is shared
//! read-only across requests.

mod load;
mod save;

pub use save::SaveReport;

use crate::core::identity::IdFactory;
use crate::core::overrides::DEFAULT_DECODE_PASSES;
use crate::core::repository::FormDataRepository;

pub struct FormModelMapper<R, I> {
    repository: R,
    ids: I,
    override_decode_passes: usize,
}

impl<R: FormDataRepository, I: IdFactory> FormModelMapper<R, I> {
    pub fn new(repository: R, ids: I) -> Self {
        Self {
            repository,
            ids,
            override_decode_passes: DEFAULT_DECODE_PASSES,
        }
    }

    /// How many times field overrides are URL-decoded before parsing
    pub fn with_override_decode_passes(mut self, passes: usize) -> Self {
        self.override_decode_passes = passes;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn id_factory(&self) -> &I {
        &self.ids
    }
}
