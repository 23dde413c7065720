//! Page stack entries and the values they carry

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use uuid::Uuid;

use crate::page::Page;
use crate::transition::PageTransition;

/// Unique identifier for a stack entry
pub type EntryId = Uuid;

/// Identity of a logical page type.
///
/// The token is the fully qualified name a [`crate::page::PageFactory`]
/// resolves; it is also what the state codec writes and reads back.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageTypeId(Arc<str>);

impl PageTypeId {
    /// Create a type identity from its token
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Placeholder identity for objects no factory could resolve
    pub(crate) fn unresolved() -> Self {
        Self::new("<unresolved>")
    }
}

impl fmt::Display for PageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageTypeId({})", self.0)
    }
}

impl From<&str> for PageTypeId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for PageTypeId {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// Parameter attached to a navigation request.
///
/// Only the primitive kinds survive serialization; `Opaque` carries any
/// value for in-memory navigation but cannot be captured by
/// `get_navigation_state`.
#[derive(Clone, Default)]
pub enum NavParameter {
    #[default]
    None,
    Text(String),
    Char(char),
    Int(i64),
    Float(f64),
    Uuid(Uuid),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl NavParameter {
    /// Whether this parameter can round-trip through the state codec
    pub fn is_persistable(&self) -> bool {
        !matches!(self, NavParameter::Opaque(_))
    }

    /// Text form written by the state codec; `None` for opaque values
    pub fn text_form(&self) -> Option<String> {
        match self {
            NavParameter::None => Some(String::new()),
            NavParameter::Text(text) => Some(text.clone()),
            NavParameter::Char(c) => Some(c.to_string()),
            NavParameter::Int(n) => Some(n.to_string()),
            NavParameter::Float(x) => Some(x.to_string()),
            NavParameter::Uuid(id) => Some(id.to_string()),
            NavParameter::Opaque(_) => None,
        }
    }

    /// Rebuild a parameter from its text form; restored parameters are
    /// always `None` or `Text`
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            NavParameter::None
        } else {
            NavParameter::Text(text.to_string())
        }
    }

    /// Access an opaque parameter's payload
    pub fn as_opaque(&self) -> Option<&Arc<dyn Any + Send + Sync>> {
        match self {
            NavParameter::Opaque(value) => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for NavParameter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NavParameter::None, NavParameter::None) => true,
            (NavParameter::Text(a), NavParameter::Text(b)) => a == b,
            (NavParameter::Char(a), NavParameter::Char(b)) => a == b,
            (NavParameter::Int(a), NavParameter::Int(b)) => a == b,
            (NavParameter::Float(a), NavParameter::Float(b)) => a == b,
            (NavParameter::Uuid(a), NavParameter::Uuid(b)) => a == b,
            (NavParameter::Opaque(a), NavParameter::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for NavParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavParameter::None => f.write_str("None"),
            NavParameter::Text(text) => f.debug_tuple("Text").field(text).finish(),
            NavParameter::Char(c) => f.debug_tuple("Char").field(c).finish(),
            NavParameter::Int(n) => f.debug_tuple("Int").field(n).finish(),
            NavParameter::Float(x) => f.debug_tuple("Float").field(x).finish(),
            NavParameter::Uuid(id) => f.debug_tuple("Uuid").field(id).finish(),
            NavParameter::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<&str> for NavParameter {
    fn from(text: &str) -> Self {
        NavParameter::Text(text.to_string())
    }
}

impl From<String> for NavParameter {
    fn from(text: String) -> Self {
        NavParameter::Text(text)
    }
}

impl From<char> for NavParameter {
    fn from(c: char) -> Self {
        NavParameter::Char(c)
    }
}

impl From<i64> for NavParameter {
    fn from(n: i64) -> Self {
        NavParameter::Int(n)
    }
}

impl From<f64> for NavParameter {
    fn from(x: f64) -> Self {
        NavParameter::Float(x)
    }
}

impl From<Uuid> for NavParameter {
    fn from(id: Uuid) -> Self {
        NavParameter::Uuid(id)
    }
}

/// One navigated-to page occurrence.
///
/// The source type is fixed at construction; the transition and the realized
/// page instance are each set at most once and stable afterwards. Cloning
/// shares the instance, so a clone stays identity-equal to the original's
/// page while keeping its own lazy cells.
#[derive(Clone)]
pub struct PageStackEntry {
    id: EntryId,
    source_type: PageTypeId,
    parameter: NavParameter,
    transition: OnceCell<PageTransition>,
    instance: OnceCell<Arc<dyn Page>>,
}

impl PageStackEntry {
    /// Create an entry that will resolve its instance lazily
    pub fn new(
        source_type: PageTypeId,
        parameter: NavParameter,
        transition: Option<PageTransition>,
    ) -> Self {
        let cell = OnceCell::new();
        if let Some(transition) = transition {
            let _ = cell.set(transition);
        }
        Self {
            id: Uuid::new_v4(),
            source_type,
            parameter,
            transition: cell,
            instance: OnceCell::new(),
        }
    }

    /// Create an entry around an already realized page instance
    pub fn with_instance(
        source_type: PageTypeId,
        parameter: NavParameter,
        transition: Option<PageTransition>,
        instance: Arc<dyn Page>,
    ) -> Self {
        let entry = Self::new(source_type, parameter, transition);
        let _ = entry.instance.set(instance);
        entry
    }

    /// Stable identity of this entry across containers
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn source_type(&self) -> &PageTypeId {
        &self.source_type
    }

    pub fn parameter(&self) -> &NavParameter {
        &self.parameter
    }

    pub fn transition(&self) -> Option<&PageTransition> {
        self.transition.get()
    }

    pub fn instance(&self) -> Option<&Arc<dyn Page>> {
        self.instance.get()
    }

    /// Set the realized instance; later calls are ignored
    pub(crate) fn set_instance(&self, instance: Arc<dyn Page>) {
        let _ = self.instance.set(instance);
    }

    /// Set the transition; later calls are ignored
    pub(crate) fn set_transition(&self, transition: PageTransition) {
        let _ = self.transition.set(transition);
    }
}

impl fmt::Debug for PageStackEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageStackEntry")
            .field("id", &self.id)
            .field("source_type", &self.source_type)
            .field("parameter", &self.parameter)
            .field("transition", &self.transition.get())
            .field("resolved", &self.instance.get().is_some())
            .finish()
    }
}
