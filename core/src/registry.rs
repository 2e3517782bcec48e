//! Conversion handlers and the ordered registry that resolves them.
//!
//! Resolution walks the registry in registration order and picks the first
//! handler whose capability predicate accepts the binding and argument
//! count. Registration order is the only tie-break: a generic many-argument
//! handler registered before a specific one shadows it. Re-registering a
//! handler type replaces the instance but keeps its original position.

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::binding::Binding;
use crate::error::HandlerError;
use crate::handlers::{
    BoolHandler, CallbackHandler, CollectionHandler, FlagHandler, MapHandler, ParseHandler,
    StringHandler,
};

/// Applies string arguments to one kind of binding target.
pub trait OptionHandler {
    /// Whether this handler can apply `arg_count` arguments to `target`.
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool;

    /// Validates the arguments without touching the target. Called during
    /// the dry run.
    fn check(&self, _target: &Binding, _args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Writes the arguments to the target.
    ///
    /// For the main parameter `args` holds every accumulated value in order.
    fn apply(&self, target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError>;

    /// A display name for diagnostics.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Strips module paths from a type name, keeping generic arguments readable
/// (`optbind_core::handlers::ParseHandler<i64>` → `ParseHandler<i64>`).
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

/// An explicitly requested handler type, instantiated on demand when it is
/// not registered.
#[derive(Clone)]
pub struct HandlerRequest {
    type_id: TypeId,
    type_name: &'static str,
    create: fn() -> Rc<dyn OptionHandler>,
}

impl HandlerRequest {
    /// Requests handler type `H`.
    pub fn of<H: OptionHandler + Default + 'static>() -> Self {
        fn create<H: OptionHandler + Default + 'static>() -> Rc<dyn OptionHandler> {
            Rc::new(H::default())
        }
        Self {
            type_id: TypeId::of::<H>(),
            type_name: std::any::type_name::<H>(),
            create: create::<H>,
        }
    }

    /// The requested handler's type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for HandlerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRequest").field(&self.type_name).finish()
    }
}

struct Entry {
    type_id: TypeId,
    handler: Rc<dyn OptionHandler>,
}

/// Ordered mapping from handler type to handler instance.
///
/// # Examples
///
/// ```
/// use optbind_core::{Binding, FlagHandler, HandlerRegistry, Slot};
///
/// let registry = HandlerRegistry::with_defaults();
/// let flag = Slot::new(false);
/// let handler = registry.resolve(&Binding::from(&flag), 0, None).unwrap();
/// assert_eq!(handler.name(), "FlagHandler");
///
/// let mut empty = HandlerRegistry::new();
/// assert!(empty.resolve(&Binding::from(&flag), 0, None).is_none());
/// empty.register(FlagHandler);
/// assert!(empty.resolve(&Binding::from(&flag), 0, None).is_some());
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Entry>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in handlers in their default
    /// order.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FlagHandler);
        registry.register(BoolHandler::default());
        registry.register(StringHandler);
        registry.register(MapHandler);
        registry.register(CollectionHandler);
        registry.register(CallbackHandler);
        registry.register(ParseHandler::<i64>::default());
        registry.register(ParseHandler::<i32>::default());
        registry.register(ParseHandler::<u64>::default());
        registry.register(ParseHandler::<u32>::default());
        registry.register(ParseHandler::<usize>::default());
        registry.register(ParseHandler::<u8>::default());
        registry.register(ParseHandler::<f64>::default());
        registry.register(ParseHandler::<std::path::PathBuf>::default());
        registry
    }

    /// Registers a handler. A handler of the same type is replaced in place.
    pub fn register<H: OptionHandler + 'static>(&mut self, handler: H) {
        let type_id = TypeId::of::<H>();
        let handler: Rc<dyn OptionHandler> = Rc::new(handler);
        tracing::debug!(handler = handler.name(), "Registering option handler");
        match self.entries.iter_mut().find(|e| e.type_id == type_id) {
            Some(entry) => entry.handler = handler,
            None => self.entries.push(Entry { type_id, handler }),
        }
    }

    /// Removes the handler of type `H`, if registered.
    pub fn unregister<H: OptionHandler + 'static>(&mut self) {
        let type_id = TypeId::of::<H>();
        self.entries.retain(|e| e.type_id != type_id);
    }

    /// Removes all handlers.
    pub fn unregister_all(&mut self) {
        self.entries.clear();
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handler names in registration order.
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.handler.name()).collect()
    }

    /// Finds a handler for `target` taking `arg_count` arguments.
    ///
    /// With a request, only the requested type is considered (the registered
    /// instance, or a fresh one); it is returned only if it accepts the
    /// target. Without a request, the first accepting handler in
    /// registration order wins.
    pub fn resolve(
        &self,
        target: &Binding,
        arg_count: usize,
        requested: Option<&HandlerRequest>,
    ) -> Option<Rc<dyn OptionHandler>> {
        match requested {
            Some(request) => {
                let handler = self
                    .entries
                    .iter()
                    .find(|e| e.type_id == request.type_id)
                    .map(|e| Rc::clone(&e.handler))
                    .unwrap_or_else(|| (request.create)());
                handler
                    .can_handle(target, arg_count)
                    .then_some(handler)
            }
            None => self
                .entries
                .iter()
                .find(|e| e.handler.can_handle(target, arg_count))
                .map(|e| Rc::clone(&e.handler)),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handler_names()).finish()
    }
}
