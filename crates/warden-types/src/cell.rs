use std::sync::Arc;

use parking_lot::RwLock;

/// A configuration snapshot tagged with the version it was published under.
#[derive(Debug)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Versioned pointer to an immutable configuration snapshot.
///
/// Readers take an `Arc` to the current snapshot and keep using it for the
/// rest of their evaluation; `store` publishes a whole new snapshot and never
/// mutates one in place.
#[derive(Debug)]
pub struct ConfigCell<T> {
    current: RwLock<Arc<Versioned<T>>>,
}

impl<T> ConfigCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(Versioned { version: 1, value })),
        }
    }

    /// The snapshot in effect right now.
    pub fn load(&self) -> Arc<Versioned<T>> {
        self.current.read().clone()
    }

    /// Publish a new snapshot, returning its version.
    pub fn store(&self, value: T) -> u64 {
        let mut current = self.current.write();
        let version = current.version + 1;
        *current = Arc::new(Versioned { version, value });
        version
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }
}

impl<T: Default> Default for ConfigCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
