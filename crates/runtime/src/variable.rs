//! `Variable` (spec §3/§4.B): a heap cell holding one `Value` plus the
//! initialisation/immutability/GC bookkeeping bits References and the
//! collector need.

use crate::value::Value;
use asteria_core::{ErrorKind, Fault};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// A shared, interior-mutable Variable cell. Every `Reference` whose root
/// is `variable(...)` holds one of these; the garbage collector tracks
/// them by pointer identity.
pub type VariableHandle = Rc<RefCell<Variable>>;

#[derive(Debug)]
pub struct Variable {
    value: Value,
    initialized: bool,
    immutable: bool,
    gc_managed: bool,
    /// Transient scratch used only while a collection is running
    /// (spec §3, component H). Never meaningful outside
    /// [`crate::gc::GarbageCollector::collect_generation`].
    gc_ref: Cell<u32>,
}

/// Sentinel value a variable's slot holds after [`Variable::uninitialize`],
/// so that a stray read after destruction is diagnosable rather than
/// silently returning `null`.
pub const DESTROYED_SENTINEL: &str = "[[`destroyed variable`]]";

impl Variable {
    pub fn new(gc_managed: bool) -> Self {
        Variable {
            value: Value::Null,
            initialized: false,
            immutable: false,
            gc_managed,
            gc_ref: Cell::new(0),
        }
    }

    /// Wrap a host-owned value as a foreign (non-GC-managed) variable,
    /// already initialized. Used by the embedding surface (spec §6,
    /// §8 scenario 6) to share state with script code.
    pub fn foreign(value: Value) -> Self {
        Variable {
            value,
            initialized: true,
            immutable: false,
            gc_managed: false,
            gc_ref: Cell::new(0),
        }
    }

    pub fn handle(self) -> VariableHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Fails with `not_initialized` per spec §4.B ("mutating
    /// uninitialised fails").
    pub fn mut_value(&mut self) -> Result<&mut Value, Fault> {
        if !self.initialized {
            return Err(Fault::new(
                ErrorKind::NotInitialized,
                "cannot mutate an uninitialized variable",
            ));
        }
        Ok(&mut self.value)
    }

    /// Sets the value and marks the variable initialised. Intentionally
    /// unconditional (matches the original's behaviour): it is the
    /// caller's job, not this method's, to enforce "at most once between
    /// uninitialize points" as a usage discipline.
    pub fn initialize(&mut self, value: Value) {
        self.value = value;
        self.initialized = true;
    }

    /// Always succeeds; resets to a debug sentinel so a dangling read is
    /// diagnosable. Called by the collector when reclaiming a variable,
    /// and by scope teardown when a binding goes out of reach.
    pub fn uninitialize(&mut self) {
        self.value = Value::string_from_static(DESTROYED_SENTINEL);
        self.initialized = false;
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    pub fn set_immutable(&mut self, immutable: bool) {
        self.immutable = immutable;
    }

    pub fn is_gc_managed(&self) -> bool {
        self.gc_managed
    }

    pub(crate) fn gc_ref(&self) -> u32 {
        self.gc_ref.get()
    }

    pub(crate) fn set_gc_ref(&self, value: u32) {
        self.gc_ref.set(value);
    }
}

/// A set of [`VariableHandle`]s keyed by pointer identity, used as the
/// collector's work queues (spec §3 `staged`/`temp_1`/`temp_2`/`unreach`)
/// and as the per-generation `tracked` set.
///
/// Mirrors the original's `Variable_hashset`: unordered, dedups by
/// address, supports draining ("extract") for worklist-style BFS.
#[derive(Debug, Default)]
pub struct VariableSet {
    entries: HashMap<usize, VariableHandle>,
}

fn addr(handle: &VariableHandle) -> usize {
    Rc::as_ptr(handle) as usize
}

impl VariableSet {
    pub fn new() -> Self {
        VariableSet::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, handle: &VariableHandle) -> bool {
        self.entries.contains_key(&addr(handle))
    }

    /// Returns `true` if this is a new member (matches
    /// `Variable_hashset::insert`'s bool-return convention).
    pub fn insert(&mut self, handle: VariableHandle) -> bool {
        self.entries.insert(addr(&handle), handle).is_none()
    }

    pub fn erase(&mut self, handle: &VariableHandle) -> bool {
        self.entries.remove(&addr(handle)).is_some()
    }

    /// Pop an arbitrary member, for worklist draining.
    pub fn extract_one(&mut self) -> Option<VariableHandle> {
        let key = *self.entries.keys().next()?;
        self.entries.remove(&key)
    }

    /// Move every member of `other` into `self`, leaving `other` empty.
    pub fn merge(&mut self, other: &mut VariableSet) {
        self.entries.extend(other.entries.drain());
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableHandle> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut v = Variable::new(true);
        assert!(!v.initialized());
        assert!(v.mut_value().is_err());

        v.initialize(Value::Integer(42));
        assert!(v.initialized());
        assert_eq!(v.value(), &Value::Integer(42));

        v.uninitialize();
        assert!(!v.initialized());
        assert!(matches!(v.value(), Value::String(_)));
    }

    #[test]
    fn foreign_is_not_gc_managed() {
        let v = Variable::foreign(Value::Integer(1));
        assert!(!v.is_gc_managed());
        assert!(v.initialized());
    }

    #[test]
    fn variable_set_dedups_by_identity() {
        let mut set = VariableSet::new();
        let handle = Variable::new(true).handle();
        assert!(set.insert(handle.clone()));
        assert!(!set.insert(handle.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.erase(&handle));
        assert!(set.is_empty());
    }
}
