//! Binding targets: the configuration slots options write to.
//!
//! A configuration struct owns [`Slot`]s; declaring an option hands the
//! engine a [`Binding`], a type-erased handle sharing the same storage.
//! Handlers inspect the binding's type to decide whether they can apply to
//! it, then downcast it back to a typed slot to write the value.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::HandlerError;

/// A shared, interior-mutable configuration slot.
///
/// Cloning a slot shares the underlying value, so the configuration object
/// and the parser observe the same storage.
///
/// # Examples
///
/// ```
/// use optbind_core::Slot;
///
/// let name = Slot::new("x".to_string());
/// let alias = name.clone();
/// alias.set("y".to_string());
/// assert_eq!(name.get(), "y");
/// ```
pub struct Slot<T>(Rc<RefCell<T>>);

impl<T> Slot<T> {
    /// Creates a slot holding `value`.
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Replaces the value.
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Replaces the value, returning the previous one.
    pub fn replace(&self, value: T) -> T {
        self.0.replace(value)
    }

    /// Borrows the value.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrows the value.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Returns `true` when both slots share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Slot<T> {
    /// Returns a copy of the value.
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => f.debug_tuple("Slot").field(&*value).finish(),
            Err(_) => f.write_str("Slot(<borrowed>)"),
        }
    }
}

type CallbackFn = dyn Fn(&[String]) -> Result<(), HandlerError>;

/// An option target that runs a closure instead of storing a value.
///
/// The closure receives the option's arguments. With a fixed arity the
/// callback only binds options declaring exactly that many arguments. An
/// optional validator runs during the dry run, before any callback fires.
#[derive(Clone)]
pub struct Callback {
    arity: Option<usize>,
    func: Rc<CallbackFn>,
    validator: Option<Rc<CallbackFn>>,
}

impl Callback {
    /// A callback accepting any number of arguments.
    pub fn new(func: impl Fn(&[String]) -> Result<(), HandlerError> + 'static) -> Self {
        Self {
            arity: None,
            func: Rc::new(func),
            validator: None,
        }
    }

    /// A callback accepting exactly `arity` arguments.
    pub fn with_arity(
        arity: usize,
        func: impl Fn(&[String]) -> Result<(), HandlerError> + 'static,
    ) -> Self {
        Self {
            arity: Some(arity),
            func: Rc::new(func),
            validator: None,
        }
    }

    /// Adds a side-effect free check of the arguments.
    pub fn with_validator(
        mut self,
        validator: impl Fn(&[String]) -> Result<(), HandlerError> + 'static,
    ) -> Self {
        self.validator = Some(Rc::new(validator));
        self
    }

    /// The fixed arity, if any.
    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    /// Invokes the closure.
    pub fn call(&self, args: &[String]) -> Result<(), HandlerError> {
        (self.func)(args)
    }

    /// Runs the validator, if any.
    pub fn validate(&self, args: &[String]) -> Result<(), HandlerError> {
        match &self.validator {
            Some(validator) => validator(args),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("arity", &self.arity)
            .field("validated", &self.validator.is_some())
            .finish()
    }
}

/// Type-erased handle to one configuration slot.
///
/// # Examples
///
/// ```
/// use optbind_core::{Binding, Slot};
///
/// let verbose = Slot::new(false);
/// let binding = Binding::from(&verbose);
/// assert!(binding.is::<bool>());
/// assert!(!binding.is::<String>());
///
/// binding.slot::<bool>().unwrap().set(true);
/// assert!(verbose.get());
/// ```
#[derive(Clone)]
pub struct Binding {
    type_id: TypeId,
    type_name: &'static str,
    cell: Rc<dyn Any>,
}

impl Binding {
    /// Binds a typed slot.
    pub fn of<T: 'static>(slot: &Slot<T>) -> Self {
        let cell: Rc<dyn Any> = slot.0.clone();
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            cell,
        }
    }

    /// Binds a closure.
    pub fn callback(callback: Callback) -> Self {
        Self::of(&Slot::new(callback))
    }

    /// Returns `true` if the bound slot holds a `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Recovers the typed slot, if the binding holds a `T`.
    pub fn slot<T: 'static>(&self) -> Option<Slot<T>> {
        Rc::clone(&self.cell)
            .downcast::<RefCell<T>>()
            .ok()
            .map(Slot)
    }

    /// The bound callback, if this is a callback binding.
    pub fn as_callback(&self) -> Option<Callback> {
        self.slot::<Callback>().map(|slot| slot.get())
    }

    /// The Rust type name of the bound value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<T: 'static> From<&Slot<T>> for Binding {
    fn from(slot: &Slot<T>) -> Self {
        Self::of(slot)
    }
}

impl From<Callback> for Binding {
    fn from(callback: Callback) -> Self {
        Self::callback(callback)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("type", &self.type_name)
            .finish()
    }
}
