//! The global context (spec §3/§4.H): owns the garbage collector, the
//! top-level name→reference table every executive context chain bottoms
//! out at, and the frozen "language API version" that pins the shape of
//! the standard bindings installed into it.

use crate::bytestring::ByteString;
use crate::gc::GarbageCollector;
use crate::reference::Reference;
use std::collections::HashMap;

/// Bumped whenever the set or shape of standard bindings this crate
/// installs changes in a way a host embedding might need to know about.
pub const LANGUAGE_API_VERSION: u32 = 1;

#[derive(Debug)]
pub struct GlobalContext {
    gc: GarbageCollector,
    named_references: HashMap<ByteString, Reference>,
}

impl Default for GlobalContext {
    fn default() -> Self {
        GlobalContext { gc: GarbageCollector::new(), named_references: HashMap::new() }
    }
}

impl GlobalContext {
    pub fn new() -> Self {
        GlobalContext::default()
    }

    pub fn gc(&self) -> &GarbageCollector {
        &self.gc
    }

    pub fn gc_mut(&mut self) -> &mut GarbageCollector {
        &mut self.gc
    }

    pub fn create_variable(&mut self, gen_hint: usize) -> crate::variable::VariableHandle {
        self.gc.create_variable(gen_hint)
    }

    pub fn collect(&mut self, gen_limit: usize) -> usize {
        self.gc.collect(gen_limit)
    }

    pub fn threshold(&self, gen: usize) -> usize {
        self.gc.threshold(gen)
    }

    pub fn set_threshold(&mut self, gen: usize, value: usize) {
        self.gc.set_threshold(gen, value)
    }

    pub fn insert_named_reference(&mut self, name: ByteString, reference: Reference) {
        self.named_references.insert(name, reference);
    }

    pub fn get_named_reference_opt(&self, name: &ByteString) -> Option<Reference> {
        self.named_references.get(name).cloned()
    }

    pub fn remove_named_reference(&mut self, name: &ByteString) -> Option<Reference> {
        self.named_references.remove(name)
    }

    pub fn named_reference_names(&self) -> impl Iterator<Item = &ByteString> {
        self.named_references.keys()
    }
}

impl Drop for GlobalContext {
    /// Runs `finalize()` (spec §4.H) to break any remaining Variable
    /// cycles before this context's own fields drop, so a cyclic data
    /// structure left live at program exit doesn't leak past process
    /// teardown diagnostics.
    fn drop(&mut self) {
        self.gc.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn named_reference_roundtrip() {
        let mut ctx = GlobalContext::new();
        let handle = ctx.create_variable(0);
        handle.borrow_mut().initialize(Value::Integer(5));
        ctx.insert_named_reference(ByteString::from("pi_approx"), Reference::from_variable(handle));
        let found = ctx.get_named_reference_opt(&ByteString::from("pi_approx"));
        assert_eq!(found.unwrap().read().unwrap(), Value::Integer(5));
        assert!(ctx.get_named_reference_opt(&ByteString::from("nope")).is_none());
    }

    #[test]
    fn finalize_runs_on_drop() {
        let mut ctx = GlobalContext::new();
        let handle = ctx.create_variable(0);
        handle.borrow_mut().initialize(Value::Integer(1));
        drop(ctx);
        assert!(!handle.borrow().initialized());
    }
}
