//! Collaborator seams: pages, factories, presentation, and scheduling

use std::any::Any;
use std::sync::Arc;

use ahash::AHashMap;
use anyhow::anyhow;
use parking_lot::Mutex;

use crate::entry::PageTypeId;
use crate::navigation::{NavigationDecision, NavigationEventArgs};
use crate::transition::PageTransition;

/// A displayable page hosted by the navigation control.
///
/// The lifecycle hooks default to no-ops so trivial pages implement nothing
/// beyond their identity.
pub trait Page: Send + Sync {
    /// Registry identity of this page's logical type
    fn source_type(&self) -> PageTypeId;

    /// Concrete-type access, used for identity and type matching in the
    /// page cache
    fn as_any(&self) -> &dyn Any;

    /// Cancelable: the page is about to be navigated away from
    fn on_navigating_from(&self, _args: &NavigationEventArgs) -> NavigationDecision {
        NavigationDecision::Proceed
    }

    /// The page has been superseded as the displayed content
    fn on_navigated_from(&self, _args: &NavigationEventArgs) {}

    /// The page has become the displayed content
    fn on_navigated_to(&self, _args: &NavigationEventArgs) {}
}

/// Produces page instances for the navigation engine.
pub trait PageFactory: Send + Sync {
    /// Produce an instance for `source_type`
    fn create(&self, source_type: &PageTypeId) -> anyhow::Result<Arc<dyn Page>>;

    /// Whether `source_type` is resolvable, without instantiating it
    fn can_create(&self, source_type: &PageTypeId) -> bool;

    /// Map an arbitrary object to a page, for object-initiated navigation
    fn page_for_object(&self, _target: &(dyn Any + Send + Sync)) -> Option<Arc<dyn Page>> {
        None
    }
}

type PageCtor = Box<dyn Fn() -> anyhow::Result<Arc<dyn Page>> + Send + Sync>;

/// Table-driven [`PageFactory`] keyed by type token.
#[derive(Default)]
pub struct PageRegistry {
    ctors: AHashMap<PageTypeId, PageCtor>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for a page type
    pub fn register<F>(&mut self, source_type: impl Into<PageTypeId>, ctor: F)
    where
        F: Fn() -> anyhow::Result<Arc<dyn Page>> + Send + Sync + 'static,
    {
        self.ctors.insert(source_type.into(), Box::new(ctor));
    }

    /// Registered type count
    pub fn len(&self) -> usize {
        self.ctors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctors.is_empty()
    }
}

impl PageFactory for PageRegistry {
    fn create(&self, source_type: &PageTypeId) -> anyhow::Result<Arc<dyn Page>> {
        match self.ctors.get(source_type) {
            Some(ctor) => ctor(),
            None => Err(anyhow!("no page registered for '{source_type}'")),
        }
    }

    fn can_create(&self, source_type: &PageTypeId) -> bool {
        self.ctors.contains_key(source_type)
    }
}

/// Accepts the page to display and the transition to play against it.
pub trait PresentationSink: Send + Sync {
    /// Make `page` the displayed content
    fn show(&self, page: &Arc<dyn Page>);

    /// Drop whatever is currently displayed (used by state restore)
    fn clear(&self);

    /// Play `transition` against the current display surface
    fn play_transition(&self, transition: &PageTransition);
}

/// Runs work the engine defers past the host's layout pass.
pub trait TransitionScheduler: Send + Sync {
    fn defer(&self, task: Box<dyn FnOnce() + Send>);
}

/// Scheduler that runs deferred tasks inline
#[derive(Default)]
pub struct ImmediateScheduler;

impl TransitionScheduler for ImmediateScheduler {
    fn defer(&self, task: Box<dyn FnOnce() + Send>) {
        task();
    }
}

/// Scheduler that queues deferred tasks until the host drains them,
/// typically once per layout pass
#[derive(Default)]
pub struct QueuedScheduler {
    queue: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl QueuedScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run every queued task in submission order
    pub fn drain(&self) {
        let tasks: Vec<_> = std::mem::take(&mut *self.queue.lock());
        for task in tasks {
            task();
        }
    }
}

impl TransitionScheduler for QueuedScheduler {
    fn defer(&self, task: Box<dyn FnOnce() + Send>) {
        self.queue.lock().push(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BlankPage;

    impl Page for BlankPage {
        fn source_type(&self) -> PageTypeId {
            "test.blank".into()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_registry_create_and_resolve() {
        let mut registry = PageRegistry::new();
        registry.register("test.blank", || Ok(Arc::new(BlankPage)));

        assert!(registry.can_create(&"test.blank".into()));
        assert!(!registry.can_create(&"test.missing".into()));
        assert!(registry.create(&"test.blank".into()).is_ok());
        assert!(registry.create(&"test.missing".into()).is_err());
    }

    #[test]
    fn test_queued_scheduler_runs_on_drain() {
        let scheduler = QueuedScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = runs.clone();
        scheduler.defer(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);

        scheduler.drain();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }
}
