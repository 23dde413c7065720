//! Bounded store of recently created page instances

use std::any::Any;
use std::sync::Arc;

use tracing::debug;

use crate::entry::PageTypeId;
use crate::error::NavigationError;
use crate::page::{Page, PageFactory};

/// Insertion-ordered page cache, keyed by source type, FIFO eviction.
///
/// A type appears at most once. Capacity 0 disables the cache entirely:
/// nothing is stored and every lookup misses.
pub struct PageCache {
    entries: Vec<(PageTypeId, Arc<dyn Page>)>,
    capacity: usize,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-bound the cache; shrinking evicts oldest entries first
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        if capacity == 0 {
            self.entries.clear();
        } else {
            self.evict_over_capacity();
        }
    }

    /// Whether an entry of `source_type` is cached
    pub fn contains_type(&self, source_type: &PageTypeId) -> bool {
        self.entries.iter().any(|(ty, _)| ty == source_type)
    }

    /// Look up a cached instance, newest entry first, matching on type
    /// equality or on the identity/concrete type of `target`.
    pub fn try_get(
        &self,
        source_type: Option<&PageTypeId>,
        target: Option<&(dyn Any + Send + Sync)>,
    ) -> Option<Arc<dyn Page>> {
        if self.capacity == 0 {
            return None;
        }
        self.entries.iter().rev().find_map(|(ty, instance)| {
            let type_hit = source_type.is_some_and(|wanted| wanted == ty);
            let target_hit = target.is_some_and(|object| {
                same_allocation(instance, object)
                    || instance.as_any().type_id() == object.type_id()
            });
            (type_hit || target_hit).then(|| instance.clone())
        })
    }

    /// Create a fresh instance of `source_type` via `factory`.
    ///
    /// With caching enabled, a cached entry of the same type is an integrity
    /// error: history and cache would disagree about which instance owns the
    /// type. With capacity 0 the instance is created and never stored.
    pub fn create(
        &mut self,
        source_type: &PageTypeId,
        factory: &dyn PageFactory,
    ) -> Result<Arc<dyn Page>, NavigationError> {
        if self.capacity == 0 {
            return factory.create(source_type).map_err(NavigationError::Factory);
        }
        if self.contains_type(source_type) {
            return Err(NavigationError::DuplicateCacheEntry(source_type.clone()));
        }
        let instance = factory.create(source_type).map_err(NavigationError::Factory)?;
        self.entries.push((source_type.clone(), instance.clone()));
        self.evict_over_capacity();
        Ok(instance)
    }

    /// Register an externally supplied instance; no-op if the type or the
    /// instance is already present.
    pub fn try_add(&mut self, source_type: PageTypeId, instance: Arc<dyn Page>) {
        if self.capacity == 0 {
            return;
        }
        let present = self.entries.iter().any(|(ty, cached)| {
            *ty == source_type || Arc::ptr_eq(cached, &instance)
        });
        if present {
            debug!(source_type = %source_type, "page already cached, skipping registration");
            return;
        }
        self.entries.push((source_type, instance));
        self.evict_over_capacity();
    }

    /// Drop every cached instance
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn evict_over_capacity(&mut self) {
        while self.entries.len() > self.capacity {
            let (ty, _) = self.entries.remove(0);
            debug!(source_type = %ty, "evicting cached page");
        }
    }
}

fn same_allocation(instance: &Arc<dyn Page>, target: &(dyn Any + Send + Sync)) -> bool {
    let a = instance.as_any() as *const dyn Any as *const ();
    let b = target as *const (dyn Any + Send + Sync) as *const ();
    std::ptr::eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageRegistry;

    struct TestPage {
        ty: PageTypeId,
    }

    impl Page for TestPage {
        fn source_type(&self) -> PageTypeId {
            self.ty.clone()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn registry(types: &[&str]) -> PageRegistry {
        let mut registry = PageRegistry::new();
        for ty in types {
            let ty = PageTypeId::from(*ty);
            let captured = ty.clone();
            registry.register(ty, move || {
                Ok(Arc::new(TestPage {
                    ty: captured.clone(),
                }))
            });
        }
        registry
    }

    #[test]
    fn test_capacity_zero_never_stores() {
        let factory = registry(&["app.a"]);
        let mut cache = PageCache::new(0);

        let first = cache.create(&"app.a".into(), &factory).unwrap();
        let second = cache.create(&"app.a".into(), &factory).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.try_get(Some(&"app.a".into()), None).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_duplicate_type_is_integrity_error() {
        let factory = registry(&["app.a"]);
        let mut cache = PageCache::new(2);

        cache.create(&"app.a".into(), &factory).unwrap();
        let result = cache.create(&"app.a".into(), &factory);
        assert!(matches!(
            result,
            Err(NavigationError::DuplicateCacheEntry(_))
        ));
    }

    #[test]
    fn test_fifo_eviction() {
        let factory = registry(&["app.a", "app.b", "app.c"]);
        let mut cache = PageCache::new(2);

        cache.create(&"app.a".into(), &factory).unwrap();
        cache.create(&"app.b".into(), &factory).unwrap();
        cache.create(&"app.c".into(), &factory).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.try_get(Some(&"app.a".into()), None).is_none());
        assert!(cache.try_get(Some(&"app.b".into()), None).is_some());
        assert!(cache.try_get(Some(&"app.c".into()), None).is_some());
    }

    #[test]
    fn test_try_add_is_idempotent() {
        let mut cache = PageCache::new(2);
        let page: Arc<dyn Page> = Arc::new(TestPage { ty: "app.a".into() });

        cache.try_add("app.a".into(), page.clone());
        cache.try_add("app.a".into(), page.clone());
        assert_eq!(cache.len(), 1);

        // Same instance under a different token is still a no-op
        cache.try_add("app.alias".into(), page);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_try_get_by_instance_identity() {
        let mut cache = PageCache::new(2);
        let page = Arc::new(TestPage { ty: "app.a".into() });
        cache.try_add("app.a".into(), page.clone());

        let target: Arc<dyn Any + Send + Sync> = page.clone();
        let hit = cache.try_get(None, Some(&*target)).unwrap();
        assert!(Arc::ptr_eq(&hit, &(page as Arc<dyn Page>)));
    }

    #[test]
    fn test_shrinking_capacity_evicts_oldest() {
        let factory = registry(&["app.a", "app.b", "app.c"]);
        let mut cache = PageCache::new(3);

        cache.create(&"app.a".into(), &factory).unwrap();
        cache.create(&"app.b".into(), &factory).unwrap();
        cache.create(&"app.c".into(), &factory).unwrap();

        cache.set_capacity(1);
        assert_eq!(cache.len(), 1);
        assert!(cache.try_get(Some(&"app.c".into()), None).is_some());
    }
}
