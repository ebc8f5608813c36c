//! Replaceable allocator registry.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::allocator::HostAllocator;

/// Holds the currently installed [`HostAllocator`] behind an atomic pointer
/// swap.
///
/// The registry is an explicit dependency-injection point: the embedding
/// application constructs one and passes it to call sites, and tests can
/// override the allocator without hidden global state. Replacement is
/// last-writer-wins; readers never block and displaced consumers are not
/// notified. `get` returns whatever is installed at call time with no
/// snapshot guarantee across calls, but a `set` followed by a `get` on the
/// same thread always observes the just-installed allocator.
pub struct AllocatorRegistry {
    installed: ArcSwap<Arc<dyn HostAllocator>>,
}

impl AllocatorRegistry {
    /// Create a registry with `allocator` installed.
    #[must_use]
    pub fn new(allocator: Arc<dyn HostAllocator>) -> Self {
        Self {
            installed: ArcSwap::from_pointee(allocator),
        }
    }

    /// The currently installed allocator.
    #[must_use]
    pub fn get(&self) -> Arc<dyn HostAllocator> {
        Arc::clone(self.installed.load_full().as_ref())
    }

    /// Install a new allocator. Last writer wins.
    pub fn set(&self, allocator: Arc<dyn HostAllocator>) {
        self.installed.store(Arc::new(allocator));
    }
}

impl std::fmt::Debug for AllocatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocatorRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::AllocConfig;
    use crate::memory::DefaultHostAllocator;

    fn allocator() -> Arc<dyn HostAllocator> {
        Arc::new(DefaultHostAllocator::new(&AllocConfig::default()))
    }

    #[test]
    fn test_get_returns_installed() {
        let first = allocator();
        let registry = AllocatorRegistry::new(Arc::clone(&first));
        assert!(Arc::ptr_eq(&registry.get(), &first));
    }

    #[test]
    fn test_set_then_get_observes_replacement() {
        let registry = AllocatorRegistry::new(allocator());
        let replacement = allocator();
        registry.set(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&registry.get(), &replacement));
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = AllocatorRegistry::new(allocator());
        let a = allocator();
        let b = allocator();
        registry.set(Arc::clone(&a));
        registry.set(Arc::clone(&b));
        assert!(Arc::ptr_eq(&registry.get(), &b));
    }

    #[test]
    fn test_displaced_allocator_keeps_serving_existing_holders() {
        let registry = AllocatorRegistry::new(allocator());
        let held = registry.get();
        registry.set(allocator());
        // The old allocator is still usable by whoever grabbed it.
        assert!(held.allocate(64).is_ok());
    }
}
