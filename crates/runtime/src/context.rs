//! The context chain (spec §3/§4.D): `Analytic` contexts resolve names to
//! lexical depths at compile time; `Executive` contexts resolve names to
//! live `Reference`s at run time and additionally carry the `defer` stack
//! and the captured `this`.

use crate::bytestring::ByteString;
use crate::reference::Reference;
use std::collections::HashMap;
use std::rc::Rc;

/// Names beginning with this prefix are reserved for the implementation
/// (e.g. `__backtrace`, `__varg`) and may not be declared by script code
/// (spec §4.D).
pub const RESERVED_PREFIX: &str = "__";

pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Compile-time name resolution: tracks which names are declared at each
/// lexical depth so the compiler can tell a local binding from a name
/// that must fall through to the global context.
#[derive(Debug, Default)]
pub struct AnalyticContext {
    parent_depth: Option<usize>,
    names: HashMap<ByteString, ()>,
}

impl AnalyticContext {
    pub fn new(parent_depth: Option<usize>) -> Self {
        AnalyticContext { parent_depth, names: HashMap::new() }
    }

    pub fn declare(&mut self, name: ByteString) {
        self.names.insert(name, ());
    }

    pub fn is_declared_here(&self, name: &ByteString) -> bool {
        self.names.contains_key(name)
    }

    pub fn parent_depth(&self) -> Option<usize> {
        self.parent_depth
    }
}

/// One frame of the runtime context chain. `Function` frames reset
/// `defer`/`this` scope (spec §4.D: break/continue/defer never cross a
/// function boundary); `Block` frames are nested lexical scopes within a
/// function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Function,
    Block,
}

/// A runtime lexical frame: a name→Reference table plus, for `Function`
/// frames, the deferred-call stack and the captured `this`.
#[derive(Debug)]
pub struct ExecutiveContext {
    parent: Option<Rc<ExecutiveContext>>,
    kind: ContextKind,
    bindings: std::cell::RefCell<HashMap<ByteString, Reference>>,
    defer: std::cell::RefCell<Vec<crate::air::AirQueue>>,
    this_value: Option<Reference>,
}

impl ExecutiveContext {
    pub fn new_function(parent: Option<Rc<ExecutiveContext>>, this_value: Option<Reference>) -> Rc<Self> {
        Rc::new(ExecutiveContext {
            parent,
            kind: ContextKind::Function,
            bindings: std::cell::RefCell::new(HashMap::new()),
            defer: std::cell::RefCell::new(Vec::new()),
            this_value,
        })
    }

    pub fn new_block(parent: Rc<ExecutiveContext>) -> Rc<Self> {
        Rc::new(ExecutiveContext {
            parent: Some(parent),
            kind: ContextKind::Block,
            bindings: std::cell::RefCell::new(HashMap::new()),
            defer: std::cell::RefCell::new(Vec::new()),
            this_value: None,
        })
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Rc<ExecutiveContext>> {
        self.parent.as_ref()
    }

    pub fn declare(&self, name: ByteString, reference: Reference) {
        self.bindings.borrow_mut().insert(name, reference);
    }

    /// Walk this frame, then parents, stopping at the nearest binding.
    /// Does *not* fall through to the global context: callers (the AIR
    /// executor) do that themselves once this returns `None`, since only
    /// they hold the `GlobalContext` handle.
    pub fn lookup(&self, name: &ByteString) -> Option<Reference> {
        if let Some(r) = self.bindings.borrow().get(name) {
            return Some(r.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// `this` is visible within the function frame it was bound in, but
    /// does not cross into a nested function's own frame (each function
    /// call creates a fresh `Function` frame with its own `this_value`).
    pub fn find_this(&self) -> Option<Reference> {
        if let Some(t) = &self.this_value {
            return Some(t.clone());
        }
        match self.kind {
            ContextKind::Function => None,
            ContextKind::Block => self.parent.as_ref().and_then(|p| p.find_this()),
        }
    }

    /// Push a `defer`red statement body onto this frame's own stack. A
    /// `defer` runs when *its own* lexical scope exits (spec §4.E/§5),
    /// block or function alike, so this never forwards to a parent.
    pub fn push_defer(&self, body: crate::air::AirQueue) {
        self.defer.borrow_mut().push(body);
    }

    /// Drain this frame's defer stack in LIFO order (spec §4.D/§4.E:
    /// deferred statements run in reverse declaration order when the
    /// frame's lexical scope unwinds, regardless of normal completion,
    /// thrown exception, or `break`/`continue` escaping the scope).
    pub fn take_defers(&self) -> Vec<crate::air::AirQueue> {
        let mut v = self.defer.borrow_mut();
        let mut drained = std::mem::take(&mut *v);
        drained.reverse();
        drained
    }

    /// GC tracing hop for a captured closure context (spec §4.A/§4.H):
    /// every directly-bound `Variable`-rooted reference in this frame and
    /// its ancestors is reachable. `temp` dedups so a deeply nested
    /// closure chain isn't re-walked once a shared ancestor frame has
    /// already contributed its variables.
    pub fn enumerate_variables(&self, staged: &mut crate::variable::VariableSet, temp: &mut crate::variable::VariableSet) {
        for reference in self.bindings.borrow().values() {
            if let crate::reference::RefRoot::Variable(handle) = reference.root() {
                if temp.insert(handle.clone()) {
                    staged.insert(handle.clone());
                }
            }
        }
        if let Some(this_ref) = &self.this_value {
            if let crate::reference::RefRoot::Variable(handle) = this_ref.root() {
                if temp.insert(handle.clone()) {
                    staged.insert(handle.clone());
                }
            }
        }
        if let Some(parent) = &self.parent {
            parent.enumerate_variables(staged, temp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use crate::variable::Variable;

    #[test]
    fn lookup_walks_parent_chain() {
        let outer = ExecutiveContext::new_function(None, None);
        outer.declare(ByteString::from("x"), Reference::from_variable(Variable::new(true).handle()));
        let inner = ExecutiveContext::new_block(outer.clone());
        assert!(inner.lookup(&ByteString::from("x")).is_some());
        assert!(inner.lookup(&ByteString::from("y")).is_none());
    }

    #[test]
    fn this_does_not_cross_function_boundary() {
        let handle = Variable::new(true).handle();
        handle.borrow_mut().initialize(Value::Integer(1));
        let outer = ExecutiveContext::new_function(None, Some(Reference::from_variable(handle)));
        let nested_fn = ExecutiveContext::new_function(Some(outer), None);
        assert!(nested_fn.find_this().is_none());
    }

    #[test]
    fn defer_drains_in_lifo_order() {
        use crate::air::AirQueue;
        let ctx = ExecutiveContext::new_function(None, None);
        ctx.push_defer(AirQueue::new());
        ctx.push_defer(AirQueue::new());
        assert_eq!(ctx.take_defers().len(), 2);
        assert!(ctx.take_defers().is_empty());
    }

    #[test]
    fn block_scope_keeps_its_own_defer_stack() {
        use crate::air::AirQueue;
        let outer = ExecutiveContext::new_function(None, None);
        let inner = ExecutiveContext::new_block(outer.clone());
        inner.push_defer(AirQueue::new());
        assert_eq!(inner.take_defers().len(), 1);
        assert!(outer.take_defers().is_empty());
    }

    #[test]
    fn reserved_name_detection() {
        assert!(is_reserved_name("__backtrace"));
        assert!(!is_reserved_name("backtrace"));
    }
}
