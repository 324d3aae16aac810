//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{Library, LibraryId};

impl Library {
    /// Resolves the library owning a handle. Handles are only minted by
    /// libraries, so a miss means the handle came from outside this
    /// library's dependency graph.
    pub(crate) fn ensure_library(&self, id: LibraryId, what: &str) -> &Library {
        self.library(id).unwrap_or_else(|| {
            panic!(
                "Library '{}': {what} handle from {id} is not reachable \
                 (its library must be listed in the dependency module)",
                self.name()
            )
        })
    }
}
