//! Navigation engine implementation

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, error};

use super::{
    HistoryStacks, NavigationDecision, NavigationEventArgs, NavigationMode, NavigationObserver,
    NavigationOptions,
};
use crate::cache::PageCache;
use crate::codec;
use crate::config::NavigationConfig;
use crate::entry::{NavParameter, PageStackEntry, PageTypeId};
use crate::error::NavigationError;
use crate::page::{ImmediateScheduler, Page, PageFactory, PresentationSink, TransitionScheduler};
use crate::transition::PageTransition;

/// Engine state guarded as one unit: stacks, cache, ambient properties
struct EngineState {
    history: HistoryStacks,
    cache: PageCache,
    config: NavigationConfig,
    current_source_type: Option<PageTypeId>,
}

/// Orchestrates single-pane page navigation.
///
/// One logical caller at a time; a navigation runs to completion before the
/// next starts. Observer callbacks and page lifecycle hooks are invoked with
/// no internal lock held.
pub struct NavigationEngine {
    state: Arc<RwLock<EngineState>>,
    observers: Arc<RwLock<Vec<Weak<dyn NavigationObserver>>>>,
    factory: Arc<dyn PageFactory>,
    sink: Arc<dyn PresentationSink>,
    scheduler: Arc<dyn TransitionScheduler>,
    /// Set for the duration of a navigation attempt; identifies the engine's
    /// own property writes so they don't start a nested navigation
    navigating: AtomicBool,
}

impl NavigationEngine {
    /// Create an engine with default configuration
    pub fn new(factory: Arc<dyn PageFactory>, sink: Arc<dyn PresentationSink>) -> Self {
        Self::with_config(factory, sink, NavigationConfig::default())
    }

    /// Create an engine with explicit configuration, running transitions
    /// inline
    pub fn with_config(
        factory: Arc<dyn PageFactory>,
        sink: Arc<dyn PresentationSink>,
        config: NavigationConfig,
    ) -> Self {
        Self::with_scheduler(factory, sink, config, Arc::new(ImmediateScheduler))
    }

    /// Create an engine that defers transition playback to `scheduler`
    pub fn with_scheduler(
        factory: Arc<dyn PageFactory>,
        sink: Arc<dyn PresentationSink>,
        config: NavigationConfig,
        scheduler: Arc<dyn TransitionScheduler>,
    ) -> Self {
        let state = EngineState {
            history: HistoryStacks::new(config.cache_capacity),
            cache: PageCache::new(config.cache_capacity),
            config,
            current_source_type: None,
        };
        Self {
            state: Arc::new(RwLock::new(state)),
            observers: Arc::new(RwLock::new(Vec::new())),
            factory,
            sink,
            scheduler,
            navigating: AtomicBool::new(false),
        }
    }

    /// Add an observer; held weakly, dropping the `Arc` unsubscribes
    pub fn add_observer(&self, observer: Arc<dyn NavigationObserver>) {
        self.observers.write().push(Arc::downgrade(&observer));
    }

    /// Navigate to a page type, optionally carrying a parameter and a
    /// transition override
    pub fn navigate(
        &self,
        source_type: impl Into<PageTypeId>,
        parameter: NavParameter,
        transition: Option<PageTransition>,
    ) -> bool {
        self.navigate_with_options(
            source_type,
            parameter,
            NavigationOptions {
                enroll_in_history: true,
                transition,
            },
        )
    }

    /// Navigate with explicit per-request options
    pub fn navigate_with_options(
        &self,
        source_type: impl Into<PageTypeId>,
        parameter: NavParameter,
        options: NavigationOptions,
    ) -> bool {
        let entry = PageStackEntry::new(source_type.into(), parameter, options.transition);
        self.dispatch(entry, NavigationMode::New, options.enroll_in_history)
    }

    /// Navigate to the page for an arbitrary object: a cached page matching
    /// the object by identity or concrete type wins, otherwise the factory's
    /// object mapping is consulted. Fails if neither resolves.
    pub fn navigate_from_object(
        &self,
        target: Arc<dyn Any + Send + Sync>,
        options: Option<NavigationOptions>,
    ) -> bool {
        let options = options.unwrap_or_default();

        let cached = self.state.read().cache.try_get(None, Some(&*target));
        let page = match cached {
            Some(page) => page,
            None => match self.factory.page_for_object(&*target) {
                Some(page) => page,
                None => {
                    let attempted = PageTypeId::unresolved();
                    let err = NavigationError::Resolution(attempted.clone());
                    error!(error = %err, "object navigation could not resolve a page");
                    self.raise_failed(&err, &attempted);
                    return false;
                }
            },
        };

        let entry = PageStackEntry::with_instance(
            page.source_type(),
            NavParameter::None,
            options.transition,
            page,
        );
        self.dispatch(entry, NavigationMode::New, options.enroll_in_history)
    }

    /// Navigate to the most recent back-stack entry; no-op when empty
    pub fn go_back(&self, transition: Option<PageTransition>) -> bool {
        let entry = match self.state.read().history.peek_back() {
            Some(entry) => entry.clone(),
            None => return false,
        };
        if let Some(transition) = transition {
            entry.set_transition(transition);
        }
        self.dispatch(entry, NavigationMode::Back, true)
    }

    /// Navigate to the most recent forward-stack entry; no-op when empty
    pub fn go_forward(&self) -> bool {
        let entry = match self.state.read().history.peek_forward() {
            Some(entry) => entry.clone(),
            None => return false,
        };
        self.dispatch(entry, NavigationMode::Forward, true)
    }

    /// Re-display the current entry without touching the stacks
    pub fn refresh(&self) -> bool {
        let entry = match self.state.read().history.current() {
            Some(entry) => entry.clone(),
            None => return false,
        };
        self.dispatch(entry, NavigationMode::Refresh, true)
    }

    pub fn can_go_back(&self) -> bool {
        self.state.read().history.can_go_back()
    }

    pub fn can_go_forward(&self) -> bool {
        self.state.read().history.can_go_forward()
    }

    pub fn back_depth(&self) -> usize {
        self.state.read().history.back_len()
    }

    pub fn forward_depth(&self) -> usize {
        self.state.read().history.forward_len()
    }

    /// Snapshot of the current entry, if any
    pub fn current_entry(&self) -> Option<PageStackEntry> {
        self.state.read().history.current().cloned()
    }

    /// Type of the presently displayed page
    pub fn current_source_type(&self) -> Option<PageTypeId> {
        self.state.read().current_source_type.clone()
    }

    /// Property-style navigation: assigning a source type navigates to it.
    /// The engine's own write of the property during a navigation is
    /// identified by the guard flag and does not start a nested navigation.
    pub fn set_source_type(&self, source_type: impl Into<PageTypeId>) -> bool {
        if self.is_navigating() {
            return false;
        }
        self.navigate(source_type, NavParameter::None, None)
    }

    /// Whether a navigation attempt is in flight
    pub fn is_navigating(&self) -> bool {
        self.navigating.load(Ordering::SeqCst)
    }

    /// Ordered (oldest first) back-stack snapshot for host chrome
    pub fn back_stack(&self) -> Vec<(PageTypeId, NavParameter)> {
        let state = self.state.read();
        state
            .history
            .back_entries()
            .map(|entry| (entry.source_type().clone(), entry.parameter().clone()))
            .collect()
    }

    /// Ordered (most recent first) forward-stack snapshot
    pub fn forward_stack(&self) -> Vec<(PageTypeId, NavParameter)> {
        let state = self.state.read();
        state
            .history
            .forward_entries()
            .map(|entry| (entry.source_type().clone(), entry.parameter().clone()))
            .collect()
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> NavigationConfig {
        self.state.read().config.clone()
    }

    pub fn cache_capacity(&self) -> usize {
        self.state.read().config.cache_capacity
    }

    /// Re-bound the page cache and the back stack; shrinking evicts oldest
    /// entries first
    pub fn set_cache_capacity(&self, capacity: usize) {
        {
            let mut state = self.state.write();
            state.config.cache_capacity = capacity;
            state.cache.set_capacity(capacity);
            state.history.set_capacity(capacity);
        }
        self.raise_history_changed();
    }

    pub fn is_stack_enabled(&self) -> bool {
        self.state.read().config.stack_enabled
    }

    /// Toggle history recording. Turning it off clears both stacks and the
    /// cache; the displayed page stays.
    pub fn set_stack_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.state.write();
            if state.config.stack_enabled == enabled {
                false
            } else {
                state.config.stack_enabled = enabled;
                if !enabled {
                    state.history.clear_stacks();
                    state.cache.clear();
                    debug!("navigation stack disabled, history and cache cleared");
                }
                true
            }
        };
        if changed {
            self.raise_history_changed();
        }
    }

    pub fn set_default_transition(&self, transition: PageTransition) {
        self.state.write().config.default_transition = transition;
    }

    /// Serialize the full navigation history.
    ///
    /// Usage error when the navigation stack is disabled, or when any entry
    /// carries a parameter with no text form.
    pub fn get_navigation_state(&self) -> Result<String, NavigationError> {
        let state = self.state.read();
        if !state.config.stack_enabled {
            return Err(NavigationError::StackDisabled);
        }
        let back: Vec<_> = state.history.back_entries().collect();
        let forward: Vec<_> = state.history.forward_entries().collect();
        codec::serialize(state.history.current(), &back, &forward)
    }

    /// Replace the whole navigation history from serialized text.
    ///
    /// Existing history, cache, and displayed content are cleared first.
    /// With `suppress_current` false the restored current page is created,
    /// displayed, and receives `on_navigated_to` (nothing else of the
    /// navigation sequence); with `suppress_current` true the parsed current
    /// entry goes onto the back stack instead and no page is displayed.
    pub fn set_navigation_state(
        &self,
        text: &str,
        suppress_current: bool,
    ) -> Result<(), NavigationError> {
        if !self.state.read().config.stack_enabled {
            return Err(NavigationError::StackDisabled);
        }

        {
            let mut state = self.state.write();
            state.history.clear_all();
            state.cache.clear();
            state.current_source_type = None;
        }
        self.sink.clear();

        let restored = codec::parse(text, self.factory.as_ref())?;

        if let Some((source_type, parameter)) = restored.current {
            let entry = PageStackEntry::new(source_type, parameter, None);
            if suppress_current {
                self.state.write().history.push_back_entry(entry);
            } else {
                let args = NavigationEventArgs {
                    mode: NavigationMode::New,
                    transition: None,
                    parameter: entry.parameter().clone(),
                    source_type: entry.source_type().clone(),
                };
                let instance = {
                    let mut state = self.state.write();
                    state
                        .cache
                        .create(entry.source_type(), self.factory.as_ref())?
                };
                entry.set_instance(instance.clone());
                self.sink.show(&instance);
                {
                    let mut state = self.state.write();
                    state.current_source_type = Some(entry.source_type().clone());
                    state.history.replace_current(entry);
                }
                instance.on_navigated_to(&args);
            }
        }

        {
            let mut state = self.state.write();
            for (source_type, parameter) in restored.back {
                state
                    .history
                    .push_back_entry(PageStackEntry::new(source_type, parameter, None));
            }
            for (source_type, parameter) in restored.forward {
                state
                    .history
                    .append_forward_entry(PageStackEntry::new(source_type, parameter, None));
            }
        }
        self.raise_history_changed();
        Ok(())
    }

    /// Run one navigation attempt; errors become the failed notification and
    /// a `false` return, never a propagated error
    fn dispatch(&self, entry: PageStackEntry, mode: NavigationMode, enroll: bool) -> bool {
        let attempted = entry.source_type().clone();
        self.navigating.store(true, Ordering::SeqCst);
        let result = self.navigate_core(entry, mode, enroll);
        self.navigating.store(false, Ordering::SeqCst);

        match result {
            Ok(committed) => committed,
            Err(err) => {
                error!(error = %err, source_type = %attempted, "navigation failed");
                self.raise_failed(&err, &attempted);
                false
            }
        }
    }

    /// The single-pass navigation state machine. Both cancellation
    /// checkpoints run before any state mutation, so a veto needs no
    /// rollback.
    fn navigate_core(
        &self,
        entry: PageStackEntry,
        mode: NavigationMode,
        enroll: bool,
    ) -> Result<bool, NavigationError> {
        let args = NavigationEventArgs {
            mode,
            transition: entry.transition().copied(),
            parameter: entry.parameter().clone(),
            source_type: entry.source_type().clone(),
        };

        // Checkpoint: engine observers may veto.
        if self.raise_navigating(&args) == NavigationDecision::Cancel {
            debug!(source_type = %args.source_type, "navigation vetoed by observer");
            self.raise_stopped(&args);
            return Ok(false);
        }

        // Checkpoint: the outgoing page may veto.
        let outgoing = self
            .state
            .read()
            .history
            .current()
            .and_then(|current| current.instance().cloned());
        if let Some(page) = &outgoing {
            if page.on_navigating_from(&args) == NavigationDecision::Cancel {
                debug!(source_type = %args.source_type, "navigation vetoed by outgoing page");
                self.raise_stopped(&args);
                return Ok(false);
            }
        }

        // Resolve the instance. New-mode requests reuse a cached page of the
        // same type; everything else gets a fresh instance. An externally
        // supplied instance registers idempotently instead.
        if entry.instance().is_none() {
            let instance = {
                let mut state = self.state.write();
                let cached = if mode == NavigationMode::New {
                    state.cache.try_get(Some(entry.source_type()), None)
                } else {
                    None
                };
                match cached {
                    Some(instance) => instance,
                    None => state.cache.create(entry.source_type(), self.factory.as_ref())?,
                }
            };
            entry.set_instance(instance);
        } else if let Some(instance) = entry.instance() {
            self.state
                .write()
                .cache
                .try_add(entry.source_type().clone(), instance.clone());
        }
        let incoming = entry
            .instance()
            .cloned()
            .ok_or_else(|| NavigationError::Resolution(entry.source_type().clone()))?;

        let display_transition = entry
            .transition()
            .copied()
            .unwrap_or(self.state.read().config.default_transition);
        let entry_id = entry.id();

        // Promote: the new entry takes the current slot.
        let prev = self.state.write().history.replace_current(entry);

        if let Some(prev_entry) = &prev {
            if let Some(page) = prev_entry.instance() {
                page.on_navigated_from(&args);
            }
        }

        // Hand the content to the presentation layer; the transition runs
        // after the host's next layout pass and is never awaited.
        self.sink.show(&incoming);
        {
            let sink = self.sink.clone();
            self.scheduler
                .defer(Box::new(move || sink.play_transition(&display_transition)));
        }

        // Stack mutation per mode, then the ambient source-type property.
        let history_mutated = {
            let mut state = self.state.write();
            let enrolled = enroll && state.config.stack_enabled;
            if enrolled {
                match mode {
                    NavigationMode::New => {
                        state.history.clear_forward();
                        if let Some(prev_entry) = prev {
                            state.history.push_back_entry(prev_entry);
                        }
                    }
                    NavigationMode::Back => {
                        if let Some(prev_entry) = prev {
                            state.history.push_forward_entry(prev_entry);
                        }
                        state.history.remove_back(entry_id);
                    }
                    NavigationMode::Forward => {
                        if let Some(prev_entry) = prev {
                            state.history.push_back_entry(prev_entry);
                        }
                        state.history.remove_forward(entry_id);
                    }
                    NavigationMode::Refresh => {}
                }
            }
            state.current_source_type = Some(args.source_type.clone());
            enrolled && mode != NavigationMode::Refresh
        };
        if history_mutated {
            self.raise_history_changed();
        }

        self.raise_navigated(&args);
        incoming.on_navigated_to(&args);
        debug!(source_type = %args.source_type, ?mode, "navigation committed");
        Ok(true)
    }

    /// Upgrade live observers, pruning dead weak references
    fn live_observers(&self) -> Vec<Arc<dyn NavigationObserver>> {
        let mut observers = self.observers.write();
        observers.retain(|weak| weak.strong_count() > 0);
        observers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Every observer is asked; any single cancel wins
    fn raise_navigating(&self, args: &NavigationEventArgs) -> NavigationDecision {
        let mut decision = NavigationDecision::Proceed;
        for observer in self.live_observers() {
            if observer.on_navigating(args) == NavigationDecision::Cancel {
                decision = NavigationDecision::Cancel;
            }
        }
        decision
    }

    fn raise_stopped(&self, args: &NavigationEventArgs) {
        for observer in self.live_observers() {
            observer.on_navigation_stopped(args);
        }
    }

    fn raise_navigated(&self, args: &NavigationEventArgs) {
        for observer in self.live_observers() {
            observer.on_navigated(args);
        }
    }

    fn raise_failed(&self, err: &NavigationError, attempted: &PageTypeId) {
        for observer in self.live_observers() {
            observer.on_navigation_failed(err, attempted);
        }
    }

    fn raise_history_changed(&self) {
        let (can_go_back, can_go_forward) = {
            let state = self.state.read();
            (state.history.can_go_back(), state.history.can_go_forward())
        };
        for observer in self.live_observers() {
            observer.on_history_changed(can_go_back, can_go_forward);
        }
    }
}
