//! Handles into library arenas.
//!
//! Every IR node lives in the arena of the Library that created it. A handle
//! is the pair (owning library, index), so a node can be resolved from any
//! Library whose dependency Module contains the owner.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryId(u32);

impl LibraryId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            pub library: LibraryId,
            pub index: u32,
        }

        impl $name {
            pub fn new(library: LibraryId, index: usize) -> Self {
                Self {
                    library,
                    index: index as u32,
                }
            }

            #[inline]
            pub fn idx(self) -> usize {
                self.index as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}:{}", $prefix, self.library.0, self.index)
            }
        }
    };
}

handle!(
    /// A type (value, pointer or function type).
    TypeId,
    "T"
);
handle!(
    /// An instruction, constant or variable.
    OpId,
    "%"
);
handle!(FunctionId, "F");
handle!(BlockId, "B");
handle!(
    /// An `OpExtInstImport`.
    ExtImportId,
    "X"
);
