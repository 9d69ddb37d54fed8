//! Modules: uniquely-keyed registries of functions.
use std::{collections::HashMap, fmt, sync::Arc};

use slotmap::{SlotMap, new_key_type};

use crate::{
    error::Error,
    function::Function,
    observe::{Change, Observer},
};

new_key_type! {
    /// Stable generational id of a function within one module.
    pub struct FunctionId;
}

/// A compilation unit: functions addressed by a unique name.
///
/// Name collisions are resolved at registration time by appending a
/// `;<id>` suffix drawn from a module-local counter that is never reused,
/// so looking a function up by its post-registration name is always
/// unambiguous.
#[derive(Default, Clone)]
pub struct Module {
    functions: SlotMap<FunctionId, Function>,
    names: HashMap<String, FunctionId>,
    next_id: u64,
    observer: Option<Arc<dyn Observer>>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the change-notification sink for this module and every
    /// function it currently owns. Functions added later inherit it.
    pub fn set_observer(&mut self, observer: Arc<dyn Observer>) {
        for function in self.functions.values_mut() {
            function.set_observer(observer.clone());
        }
        self.observer = Some(observer);
    }

    fn touched(&self) {
        if let Some(observer) = &self.observer {
            observer.notify(Change::Module);
        }
    }

    fn make_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Register a function.
    ///
    /// The function is renamed when a `name_prefix` is given, when it is
    /// anonymous, or when its name collides with a registered one: the base
    /// name (the prefix, the current name, or `"function"`) is stripped of
    /// any existing `;<digits>` suffix and a fresh module-local id is
    /// appended. The function is stored under its final name, replacing any
    /// previous entry at that key.
    pub fn add(&mut self, mut function: Function, name_prefix: Option<&str>) -> FunctionId {
        if let Some(observer) = &self.observer {
            function.set_observer(observer.clone());
        }

        let needs_rename = name_prefix.is_some()
            || match function.name() {
                None => true,
                Some(name) => self.names.contains_key(name),
            };

        let name = if needs_rename {
            let base =
                strip_uniquifier(name_prefix.or(function.name()).unwrap_or("function")).to_string();
            let name = format!("{};{}", base, self.make_id());
            log::debug!(
                "registering function {:?} as `{name}`",
                function.original_name()
            );
            function.set_name(name.clone());
            name
        } else {
            function.name().unwrap_or("function").to_string()
        };

        if let Some(&previous) = self.names.get(&name) {
            self.functions.remove(previous);
        }
        let id = self.functions.insert(function);
        self.names.insert(name, id);
        self.touched();
        id
    }

    /// Deregister and return the function stored under `name`. Removing an
    /// absent name is a no-op; the hook fires either way.
    pub fn remove(&mut self, name: &str) -> Option<Function> {
        let function = self
            .names
            .remove(name)
            .and_then(|id| self.functions.remove(id));
        self.touched();
        function
    }

    /// Look a function up by its registered name.
    pub fn get(&self, name: &str) -> Result<&Function, Error> {
        self.names
            .get(name)
            .and_then(|&id| self.functions.get(id))
            .ok_or_else(|| Error::FunctionNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Function, Error> {
        match self.names.get(name) {
            Some(&id) => self
                .functions
                .get_mut(id)
                .ok_or_else(|| Error::FunctionNotFound(name.to_string())),
            None => Err(Error::FunctionNotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Function> {
        self.functions.values_mut()
    }
}

/// Strip a trailing `;<digits>` uniquifier so that re-registration does not
/// stack suffixes.
fn strip_uniquifier(base: &str) -> &str {
    match base.rsplit_once(';') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => base,
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("functions", &self.functions)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_uniquifier_removes_numeric_suffixes_only() {
        assert_eq!(strip_uniquifier("foo;12"), "foo");
        assert_eq!(strip_uniquifier("foo;"), "foo;");
        assert_eq!(strip_uniquifier("foo;bar"), "foo;bar");
        assert_eq!(strip_uniquifier("foo"), "foo");
        assert_eq!(strip_uniquifier("foo;1;2"), "foo;1");
    }
}
