//! Built-in conversion handlers.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::binding::{Binding, Slot};
use crate::error::HandlerError;
use crate::i18n::Message;
use crate::registry::{OptionHandler, short_type_name};

fn typed_slot<T: 'static>(target: &Binding, args: &[String]) -> Result<Slot<T>, HandlerError> {
    target
        .slot::<T>()
        .ok_or_else(|| HandlerError::unsupported_target(args, target.type_name()))
}

/// Converts every argument and returns the last value. A main parameter
/// receives all of its occurrences in one call, so none may go unchecked.
fn convert_each<T>(
    args: &[String],
    option_name: &str,
    convert: impl Fn(&str) -> Result<T, HandlerError>,
) -> Result<T, HandlerError> {
    let mut value = None;
    for arg in args {
        value = Some(convert(arg)?);
    }
    value.ok_or_else(|| {
        HandlerError::new(Message::new("Option \"{0}\" was applied without an argument.").arg(option_name))
    })
}

fn set_switch(target: &Binding, args: &[String], value: bool) -> Result<(), HandlerError> {
    typed_slot::<bool>(target, args)?.set(value);
    Ok(())
}

/// Zero-argument option setting a `bool` to `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagHandler;

impl OptionHandler for FlagHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 0 && target.is::<bool>()
    }

    fn apply(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        set_switch(target, args, true)
    }
}

/// Zero-argument option setting a `bool` to `false` (`--no-color` style).
/// Not registered by default; request it per option.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisableFlagHandler;

impl OptionHandler for DisableFlagHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 0 && target.is::<bool>()
    }

    fn apply(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        set_switch(target, args, false)
    }
}

/// One-argument option parsing a word into `bool` or `Option<bool>`.
///
/// # Examples
///
/// ```
/// use optbind_core::BoolHandler;
///
/// let handler = BoolHandler::default();
/// assert_eq!(handler.decide("ON").unwrap(), true);
/// assert_eq!(handler.decide("0").unwrap(), false);
/// assert!(handler.decide("maybe").is_err());
///
/// // Without false words, everything not true is false.
/// let lenient = BoolHandler::new(&["yes"], &[], true);
/// assert_eq!(lenient.decide("no").unwrap(), false);
/// ```
#[derive(Debug, Clone)]
pub struct BoolHandler {
    true_words: Vec<String>,
    false_words: Vec<String>,
    case_sensitive: bool,
}

impl Default for BoolHandler {
    fn default() -> Self {
        Self::new(&["on", "true", "1"], &["off", "false", "0"], false)
    }
}

impl BoolHandler {
    /// Creates a handler with custom words. An empty `false_words` list
    /// makes every word not in `true_words` false.
    pub fn new(true_words: &[&str], false_words: &[&str], case_sensitive: bool) -> Self {
        Self {
            true_words: true_words.iter().map(|w| w.to_string()).collect(),
            false_words: false_words.iter().map(|w| w.to_string()).collect(),
            case_sensitive,
        }
    }

    fn matches(&self, word: &str, candidate: &str) -> bool {
        if self.case_sensitive {
            word == candidate
        } else {
            word.eq_ignore_ascii_case(candidate)
        }
    }

    /// Interprets a word.
    pub fn decide(&self, word: &str) -> Result<bool, HandlerError> {
        if self.true_words.iter().any(|w| self.matches(word, w)) {
            return Ok(true);
        }
        if self.false_words.is_empty() || self.false_words.iter().any(|w| self.matches(word, w)) {
            return Ok(false);
        }
        Err(HandlerError::new(
            Message::new("Could not parse argument \"{0}\" as boolean parameter.").arg(word),
        ))
    }
}

impl OptionHandler for BoolHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 1 && (target.is::<bool>() || target.is::<Option<bool>>())
    }

    fn check(&self, _target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError> {
        convert_each(args, option_name, |arg| self.decide(arg)).map(|_| ())
    }

    fn apply(&self, target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError> {
        let value = convert_each(args, option_name, |arg| self.decide(arg))?;
        if let Some(slot) = target.slot::<bool>() {
            slot.set(value);
        } else {
            typed_slot::<Option<bool>>(target, args)?.set(Some(value));
        }
        Ok(())
    }
}

/// One-argument option stored in a `String` or `Option<String>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringHandler;

impl OptionHandler for StringHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 1 && (target.is::<String>() || target.is::<Option<String>>())
    }

    fn apply(&self, target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError> {
        let value = convert_each(args, option_name, |arg| Ok(arg.to_string()))?;
        if let Some(slot) = target.slot::<String>() {
            slot.set(value);
        } else {
            typed_slot::<Option<String>>(target, args)?.set(Some(value));
        }
        Ok(())
    }
}

/// Two-argument option inserting a key/value pair into a
/// `BTreeMap<String, String>` or `HashMap<String, String>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapHandler;

impl MapHandler {
    fn pairs(args: &[String]) -> Result<Vec<(String, String)>, HandlerError> {
        if args.len() % 2 != 0 {
            return Err(HandlerError::new(
                Message::new("Expected key/value pairs, but got {0} argument(s).").arg(args.len()),
            ));
        }
        Ok(args
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }
}

impl OptionHandler for MapHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 2
            && (target.is::<BTreeMap<String, String>>() || target.is::<HashMap<String, String>>())
    }

    fn check(&self, _target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        Self::pairs(args).map(|_| ())
    }

    fn apply(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        let pairs = Self::pairs(args)?;
        if let Some(slot) = target.slot::<BTreeMap<String, String>>() {
            slot.borrow_mut().extend(pairs);
        } else {
            typed_slot::<HashMap<String, String>>(target, args)?
                .borrow_mut()
                .extend(pairs);
        }
        Ok(())
    }
}

/// Option appending every argument to a `Vec<String>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionHandler;

impl OptionHandler for CollectionHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count >= 1 && target.is::<Vec<String>>()
    }

    fn apply(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        typed_slot::<Vec<String>>(target, args)?
            .borrow_mut()
            .extend_from_slice(args);
        Ok(())
    }
}

/// Option invoking a [`Callback`](crate::Callback) binding.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackHandler;

impl OptionHandler for CallbackHandler {
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        target
            .as_callback()
            .is_some_and(|cb| cb.arity().is_none_or(|arity| arity == arg_count))
    }

    fn check(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        match target.as_callback() {
            Some(callback) => callback.validate(args),
            None => Ok(()),
        }
    }

    fn apply(&self, target: &Binding, args: &[String], _option_name: &str) -> Result<(), HandlerError> {
        let callback = target
            .as_callback()
            .ok_or_else(|| HandlerError::unsupported_target(args, target.type_name()))?;
        callback.call(args)
    }
}

/// One-argument option converted through [`FromStr`] into `T` or
/// `Option<T>`.
///
/// Register it for your own types to extend the parser:
///
/// ```
/// use optbind_core::{HandlerRegistry, ParseHandler};
/// use std::net::IpAddr;
///
/// let mut registry = HandlerRegistry::with_defaults();
/// let before = registry.len();
/// registry.register(ParseHandler::<IpAddr>::default());
/// assert_eq!(registry.len(), before + 1);
/// ```
pub struct ParseHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for ParseHandler<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for ParseHandler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(short_type_name(std::any::type_name::<Self>()))
    }
}

impl<T> ParseHandler<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    fn convert(arg: &str) -> Result<T, HandlerError> {
        arg.parse::<T>().map_err(|err| {
            HandlerError::new(
                Message::new("Could not parse argument \"{0}\" as {1}: {2}")
                    .arg(arg)
                    .arg(short_type_name(std::any::type_name::<T>()))
                    .arg(err),
            )
        })
    }
}

impl<T> OptionHandler for ParseHandler<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    fn can_handle(&self, target: &Binding, arg_count: usize) -> bool {
        arg_count == 1 && (target.is::<T>() || target.is::<Option<T>>())
    }

    fn check(&self, _target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError> {
        convert_each(args, option_name, Self::convert).map(|_| ())
    }

    fn apply(&self, target: &Binding, args: &[String], option_name: &str) -> Result<(), HandlerError> {
        let value = convert_each(args, option_name, Self::convert)?;
        if let Some(slot) = target.slot::<T>() {
            slot.set(value);
        } else {
            typed_slot::<Option<T>>(target, args)?.set(Some(value));
        }
        Ok(())
    }
}
