//! Per-domain event handlers.
//!
//! Hosts register one [`DomainDispatcher`] per domain. When an event
//! arrives, its domain selects the dispatcher and its name selects the
//! handler method, which receives the event's parameters positionally.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::DispatchError;

/// Tracing target for event and response dispatch.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// A handler method invoked with an event's positional arguments.
pub type HandlerMethod = Rc<dyn Fn(&EventArgs)>;

/// Positional arguments of a delivered event.
///
/// There is one slot per registered parameter name; a parameter the backend
/// left out is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventArgs {
    method: String,
    values: Vec<Option<Value>>,
}

impl EventArgs {
    pub(crate) const fn new(method: String, values: Vec<Option<Value>>) -> Self {
        Self { method, values }
    }

    /// Fully qualified event name.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Argument at `index`, if the backend supplied it.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// Every slot, in registered order.
    #[must_use]
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// Number of slots, equal to the registered parameter count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the event has no registered parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deserialises the argument at `index` into `T`.
    ///
    /// Returns `Ok(None)` when the slot is empty or out of range.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the value does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, serde_json::Error> {
        self.get(index)
            .map(T::deserialize)
            .transpose()
    }
}

/// Handler object for one domain: a table of named methods.
#[derive(Clone, Default)]
pub struct DomainDispatcher {
    methods: HashMap<String, HandlerMethod>,
}

impl DomainDispatcher {
    /// Creates a dispatcher with no methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method and returns the dispatcher, for chained construction.
    #[must_use]
    pub fn with_method(mut self, name: impl Into<String>, handler: impl Fn(&EventArgs) + 'static) -> Self {
        self.insert(name, handler);
        self
    }

    /// Adds or replaces a method.
    pub fn insert(&mut self, name: impl Into<String>, handler: impl Fn(&EventArgs) + 'static) {
        self.methods.insert(name.into(), Rc::new(handler));
    }

    /// Whether a method with this name exists.
    #[must_use]
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Method names, sorted.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    fn method(&self, name: &str) -> Option<HandlerMethod> {
        self.methods.get(name).cloned()
    }
}

impl fmt::Debug for DomainDispatcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DomainDispatcher")
            .field("methods", &self.method_names())
            .finish()
    }
}

/// Domain name to dispatcher map.
#[derive(Debug, Default)]
pub(crate) struct DispatcherRegistry {
    dispatchers: HashMap<String, DomainDispatcher>,
}

impl DispatcherRegistry {
    /// Binds `dispatcher` to `domain`, replacing any earlier binding.
    pub(crate) fn register(&mut self, domain: &str, dispatcher: DomainDispatcher) {
        let replaced = self
            .dispatchers
            .insert(domain.to_owned(), dispatcher)
            .is_some();
        debug!(
            target: DISPATCH_TARGET,
            domain,
            replaced,
            "registered domain dispatcher"
        );
    }

    /// Finds the handler method for `name` in `domain`.
    ///
    /// The returned handle is a clone, so the caller can invoke it after
    /// releasing any borrow of the registry.
    pub(crate) fn lookup(&self, domain: &str, name: &str) -> Result<HandlerMethod, DispatchError> {
        let dispatcher = self
            .dispatchers
            .get(domain)
            .ok_or_else(|| DispatchError::unknown_domain(domain))?;
        dispatcher
            .method(name)
            .ok_or_else(|| DispatchError::unimplemented_method(format!("{domain}.{name}")))
    }

    pub(crate) fn contains(&self, domain: &str) -> bool {
        self.dispatchers.contains_key(domain)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn calls() -> Rc<RefCell<Vec<String>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn recording(calls: &Rc<RefCell<Vec<String>>>, label: &'static str) -> DomainDispatcher {
        let sink = Rc::clone(calls);
        DomainDispatcher::new().with_method("loadEventFired", move |args: &EventArgs| {
            sink.borrow_mut().push(format!("{label}:{}", args.method()));
        })
    }

    #[rstest]
    fn lookup_finds_registered_method(calls: Rc<RefCell<Vec<String>>>) {
        let mut registry = DispatcherRegistry::default();
        registry.register("Page", recording(&calls, "page"));

        let handler = registry.lookup("Page", "loadEventFired").expect("handler");
        handler(&EventArgs::new(String::from("Page.loadEventFired"), Vec::new()));

        assert_eq!(*calls.borrow(), vec!["page:Page.loadEventFired"]);
        assert!(registry.contains("Page"));
    }

    #[rstest]
    fn reregistration_replaces_the_dispatcher(calls: Rc<RefCell<Vec<String>>>) {
        let mut registry = DispatcherRegistry::default();
        registry.register("Page", recording(&calls, "old"));
        registry.register("Page", recording(&calls, "new"));

        let handler = registry.lookup("Page", "loadEventFired").expect("handler");
        handler(&EventArgs::new(String::from("Page.loadEventFired"), Vec::new()));

        assert_eq!(*calls.borrow(), vec!["new:Page.loadEventFired"]);
    }

    #[rstest]
    fn lookup_reports_unknown_domain_and_method(calls: Rc<RefCell<Vec<String>>>) {
        let mut registry = DispatcherRegistry::default();
        registry.register("Page", recording(&calls, "page"));

        let Err(unknown) = registry.lookup("Network", "requestWillBeSent") else {
            panic!("expected unknown domain");
        };
        assert!(matches!(unknown, DispatchError::UnknownDomain { ref domain } if domain == "Network"));

        let Err(missing) = registry.lookup("Page", "frameNavigated") else {
            panic!("expected unimplemented method");
        };
        assert!(matches!(
            missing,
            DispatchError::UnimplementedMethod { ref method } if method == "Page.frameNavigated"
        ));
    }

    #[rstest]
    fn event_args_expose_slots_and_decode() {
        let args = EventArgs::new(
            String::from("Console.messageAdded"),
            vec![Some(json!({"level": "log"})), None, Some(json!(7))],
        );

        assert_eq!(args.len(), 3);
        assert_eq!(args.get(0), Some(&json!({"level": "log"})));
        assert!(args.get(1).is_none());
        assert!(args.get(9).is_none());
        assert_eq!(args.decode::<u32>(2).expect("decodes"), Some(7));
        assert_eq!(args.decode::<u32>(1).expect("empty slot"), None);
        assert!(args.decode::<u32>(0).is_err());
    }

    #[rstest]
    fn dispatcher_lists_methods() {
        let dispatcher = DomainDispatcher::new()
            .with_method("b", |_: &EventArgs| {})
            .with_method("a", |_: &EventArgs| {});
        assert_eq!(dispatcher.method_names(), vec!["a", "b"]);
        assert!(dispatcher.has_method("a"));
        assert!(!dispatcher.has_method("c"));
    }
}
