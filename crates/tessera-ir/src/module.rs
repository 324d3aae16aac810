use std::sync::Arc;

use crate::{Library, LibraryId, TypeId};

/// Ordered, transitively flattened set of translated libraries.
///
/// Lookups walk it front to back; the first hit wins.
#[derive(Debug, Clone, Default)]
pub struct Module {
    libraries: Vec<Arc<Library>>,
}

impl Module {
    pub fn new(libraries: impl IntoIterator<Item = Arc<Library>>) -> Self {
        let mut module = Self::default();
        for library in libraries {
            module.push(library);
        }
        module
    }

    /// Appends a library and then its dependencies, skipping duplicates.
    pub fn push(&mut self, library: Arc<Library>) {
        if self.contains(library.id()) {
            return;
        }
        let deps: Vec<Arc<Library>> = library.dependencies().iter().cloned().collect();
        self.libraries.push(library);
        for dep in deps {
            self.push(dep);
        }
    }

    pub fn contains(&self, id: LibraryId) -> bool {
        self.libraries.iter().any(|l| l.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Library>> {
        self.libraries.iter()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn library(&self, id: LibraryId) -> Option<&Library> {
        self.libraries.iter().find(|l| l.id() == id).map(|l| l.as_ref())
    }

    pub fn find_type(&self, name: &str) -> Option<TypeId> {
        self.libraries.iter().find_map(|l| l.find_type(name, false))
    }
}
