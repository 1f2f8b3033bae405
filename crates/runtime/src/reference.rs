//! `Reference` (spec §3/§4.C): a root plus a chain of subscripts,
//! resolving to a `Value` slot that may or may not be directly
//! addressable as a Rust `&mut Value`.

use crate::object::Object;
use crate::value::Value;
use crate::variable::VariableHandle;
use asteria_core::{ErrorKind, Fault};
use std::rc::Rc;

/// One step in a reference's subscript chain (spec §4.C).
#[derive(Debug, Clone)]
pub enum Subscript {
    ArrayIndex(i64),
    ObjectKey(crate::bytestring::ByteString),
}

/// The kind of loop-exit target a `jump_marker` root names. The AIR
/// executor in this implementation threads break/continue purely
/// through `Status` (see `crate::air`); this root variant exists for
/// API completeness with the original reference model but is never
/// produced by the executor — see DESIGN.md for the rationale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpTargetKind {
    Break,
    Continue,
}

/// Where a `Reference`'s subscript chain starts (spec §4.C).
#[derive(Debug, Clone)]
pub enum RefRoot {
    /// No value yet; reading faults, writing initializes in place.
    Void,
    /// A plain, non-addressable constant (e.g. a literal in the AIR
    /// stream). Writing to a reference rooted here always faults.
    Constant(Value),
    /// The addressable common case: a variable slot.
    Variable(VariableHandle),
    /// The pending-tail-call chain root (spec §4.G); see `crate::tail_call`.
    TailCallPending(Box<crate::tail_call::TailCallRecord>),
    /// See [`JumpTargetKind`]; retained for model fidelity, unused by
    /// the executor.
    JumpMarker(JumpTargetKind, u32),
}

#[derive(Debug, Clone)]
pub struct Reference {
    root: RefRoot,
    subscripts: Vec<Subscript>,
}

impl Reference {
    pub fn from_root(root: RefRoot) -> Self {
        Reference { root, subscripts: Vec::new() }
    }

    pub fn constant(value: Value) -> Self {
        Reference::from_root(RefRoot::Constant(value))
    }

    pub fn from_variable(handle: VariableHandle) -> Self {
        Reference::from_root(RefRoot::Variable(handle))
    }

    pub fn from_tail_call(record: crate::tail_call::TailCallRecord) -> Self {
        Reference::from_root(RefRoot::TailCallPending(Box::new(record)))
    }

    /// `true` for a bare (no subscripts) pending-tail-call-rooted
    /// reference -- the shape `finish_call` drains (spec §4.G).
    pub fn is_tail_call_pending(&self) -> bool {
        self.subscripts.is_empty() && matches!(self.root, RefRoot::TailCallPending(_))
    }

    /// Consumes a bare pending-tail-call reference, returning its record.
    /// Panics (contract violation) if called on anything else; callers
    /// must check [`Reference::is_tail_call_pending`] first.
    pub fn into_tail_call_record(self) -> crate::tail_call::TailCallRecord {
        match self.root {
            RefRoot::TailCallPending(record) if self.subscripts.is_empty() => *record,
            _ => asteria_core::fatal!("into_tail_call_record called on a non-pending reference"),
        }
    }

    pub fn root(&self) -> &RefRoot {
        &self.root
    }

    pub fn push_array_index(&mut self, index: i64) {
        self.subscripts.push(Subscript::ArrayIndex(index));
    }

    pub fn push_object_key(&mut self, key: crate::bytestring::ByteString) {
        self.subscripts.push(Subscript::ObjectKey(key));
    }

    pub fn pop_subscript(&mut self) -> Option<Subscript> {
        self.subscripts.pop()
    }

    pub fn subscripts(&self) -> &[Subscript] {
        &self.subscripts
    }

    /// Resolve down to the root value, then walk subscripts read-only,
    /// cloning at the end. Never auto-extends (spec §4.C: only `write`
    /// auto-extends).
    pub fn read(&self) -> Result<Value, Fault> {
        let root = self.read_root()?;
        walk_read(&root, &self.subscripts)
    }

    /// Resolve to a mutable borrow of the addressed slot, auto-extending
    /// arrays/objects along the way as spec §4.C requires. Only valid
    /// when the root is `Variable` (or `Constant`, which still fails
    /// `write` as documented there).
    pub fn write(&self, new_value: Value) -> Result<(), Fault> {
        match &self.root {
            RefRoot::Variable(handle) => {
                let mut var = handle.borrow_mut();
                if var.is_immutable() {
                    return Err(Fault::new(ErrorKind::TypeMismatch, "cannot assign to an immutable variable"));
                }
                if self.subscripts.is_empty() {
                    var.initialize(new_value);
                    return Ok(());
                }
                let slot = var.mut_value()?;
                let target = walk_write(slot, &self.subscripts)?;
                *target = new_value;
                Ok(())
            }
            RefRoot::Void => {
                if self.subscripts.is_empty() {
                    Err(Fault::new(ErrorKind::NotInitialized, "cannot write through a void reference"))
                } else {
                    Err(Fault::new(ErrorKind::NotInitialized, "cannot subscript a void reference"))
                }
            }
            RefRoot::Constant(_) => Err(Fault::new(ErrorKind::TypeMismatch, "cannot assign to a constant reference")),
            RefRoot::TailCallPending(_) => Err(Fault::new(ErrorKind::TypeMismatch, "cannot write through a pending tail call")),
            RefRoot::JumpMarker(..) => Err(Fault::new(ErrorKind::TypeMismatch, "cannot write through a jump-marker reference")),
        }
    }

    /// Reads an addressable mutable slot without replacing it wholesale;
    /// used by compound-assignment AIR nodes.
    pub fn read_mutable<R>(&self, f: impl FnOnce(&mut Value) -> Result<R, Fault>) -> Result<R, Fault> {
        match &self.root {
            RefRoot::Variable(handle) => {
                let mut var = handle.borrow_mut();
                if var.is_immutable() {
                    return Err(Fault::new(ErrorKind::TypeMismatch, "cannot mutate an immutable variable"));
                }
                let slot = var.mut_value()?;
                let target = walk_write(slot, &self.subscripts)?;
                f(target)
            }
            _ => Err(Fault::new(ErrorKind::TypeMismatch, "reference root is not addressable")),
        }
    }

    /// Unsets the addressed slot: for a bare variable root, uninitializes
    /// it; for a subscripted array/object root, removes the element.
    pub fn unset(&self) -> Result<Value, Fault> {
        match &self.root {
            RefRoot::Variable(handle) => {
                let mut var = handle.borrow_mut();
                if var.is_immutable() {
                    return Err(Fault::new(ErrorKind::TypeMismatch, "cannot unset an immutable variable"));
                }
                if self.subscripts.is_empty() {
                    let old = var.value().clone();
                    var.uninitialize();
                    return Ok(old);
                }
                let (last, prefix) = self.subscripts.split_last().unwrap();
                let slot = var.mut_value()?;
                let parent = walk_write(slot, prefix)?;
                unset_one(parent, last)
            }
            _ => Err(Fault::new(ErrorKind::TypeMismatch, "reference root is not unsettable")),
        }
    }

    fn read_root(&self) -> Result<Value, Fault> {
        match &self.root {
            RefRoot::Void => Err(Fault::new(ErrorKind::NotInitialized, "read of a void reference")),
            RefRoot::Constant(v) => Ok(v.clone()),
            RefRoot::Variable(handle) => {
                let var = handle.borrow();
                if !var.initialized() {
                    return Err(Fault::new(ErrorKind::NotInitialized, "read of an uninitialized variable"));
                }
                Ok(var.value().clone())
            }
            RefRoot::TailCallPending(_) => Err(Fault::new(ErrorKind::TypeMismatch, "read of a pending tail call")),
            RefRoot::JumpMarker(..) => Err(Fault::new(ErrorKind::TypeMismatch, "read of a jump-marker reference")),
        }
    }
}

fn walk_read(root: &Value, subscripts: &[Subscript]) -> Result<Value, Fault> {
    let mut current = root;
    for sub in subscripts {
        current = match (current, sub) {
            (Value::Array(items), Subscript::ArrayIndex(idx)) => match resolve_index_read(items.len(), *idx) {
                Some(resolved) => &items[resolved],
                // Out-of-range read yields null rather than faulting (spec §4.C).
                None => return Ok(Value::Null),
            },
            (Value::Object(obj), Subscript::ObjectKey(key)) => match obj.get(key) {
                Some(value) => value,
                // Missing key reads as null rather than faulting (spec §4.C).
                None => return Ok(Value::Null),
            },
            (Value::Null, _) => return Ok(Value::Null),
            (other, Subscript::ArrayIndex(_)) => {
                return Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an array subscript", other.type_name())));
            }
            (other, Subscript::ObjectKey(_)) => {
                return Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an object subscript", other.type_name())));
            }
        };
    }
    Ok(current.clone())
}

/// Walk subscripts against a mutable root, auto-extending arrays with
/// `null` and objects with fresh keys as needed (spec §4.C).
fn walk_write<'a>(root: &'a mut Value, subscripts: &[Subscript]) -> Result<&'a mut Value, Fault> {
    let mut current = root;
    for sub in subscripts {
        match sub {
            Subscript::ArrayIndex(idx) => {
                if matches!(current, Value::Null) {
                    *current = Value::Array(Rc::new(Vec::new()));
                }
                let Value::Array(arr) = current else {
                    return Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an array subscript", current.type_name())));
                };
                let arr = Rc::make_mut(arr);
                let resolved = resolve_index_extend(arr, *idx)?;
                current = &mut arr[resolved];
            }
            Subscript::ObjectKey(key) => {
                if matches!(current, Value::Null) {
                    *current = Value::Object(Rc::new(Object::new()));
                }
                let Value::Object(obj) = current else {
                    return Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an object subscript", current.type_name())));
                };
                let obj = Rc::make_mut(obj);
                current = obj.get_or_insert_null_mut(key);
            }
        }
    }
    Ok(current)
}

fn unset_one(parent: &mut Value, sub: &Subscript) -> Result<Value, Fault> {
    match (parent, sub) {
        (Value::Array(arr), Subscript::ArrayIndex(idx)) => {
            let arr = Rc::make_mut(arr);
            let resolved = resolve_index(arr.len(), *idx)?;
            Ok(std::mem::replace(&mut arr[resolved], Value::Null))
        }
        (Value::Object(obj), Subscript::ObjectKey(key)) => {
            let obj = Rc::make_mut(obj);
            obj.remove(key).ok_or_else(|| Fault::new(ErrorKind::IndexOutOfRange, format!("object has no member `{key}`")))
        }
        (other, Subscript::ArrayIndex(_)) => {
            Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an array subscript", other.type_name())))
        }
        (other, Subscript::ObjectKey(_)) => {
            Err(Fault::new(ErrorKind::TypeMismatch, format!("cannot index a `{}` with an object subscript", other.type_name())))
        }
    }
}

/// Negative indices count from the end (spec §4.C); out-of-range faults.
/// Used by the write/unset paths, where an out-of-range index is always
/// diagnosable (write auto-extends instead via [`resolve_index_extend`];
/// unset has no slot to remove).
fn resolve_index(len: usize, idx: i64) -> Result<usize, Fault> {
    resolve_index_read(len, idx)
        .ok_or_else(|| Fault::new(ErrorKind::IndexOutOfRange, format!("array index {idx} is out of bounds for length {len}")))
}

/// Same resolution, but for the read path (spec §4.C: "out of range on
/// read → null"): `None` means "no slot", for the caller to turn into a
/// null read rather than a fault.
fn resolve_index_read(len: usize, idx: i64) -> Option<usize> {
    let resolved = if idx < 0 { idx + len as i64 } else { idx };
    if resolved < 0 || resolved as usize >= len { None } else { Some(resolved as usize) }
}

/// Same as [`resolve_index`] but grows the array with `null` on a
/// positive out-of-range index, per spec §4.C write semantics. A
/// negative index that still resolves out of range is always an error:
/// there is no well-defined "before the start" extension.
fn resolve_index_extend(arr: &mut Vec<Value>, idx: i64) -> Result<usize, Fault> {
    if idx < 0 {
        let resolved = idx + arr.len() as i64;
        if resolved < 0 {
            return Err(Fault::new(ErrorKind::IndexOutOfRange, format!("array index {idx} is out of bounds for length {}", arr.len())));
        }
        return Ok(resolved as usize);
    }
    let idx = idx as usize;
    if idx >= arr.len() {
        arr.resize(idx + 1, Value::Null);
    }
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    #[test]
    fn read_uninitialized_faults() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        assert!(r.read().is_err());
    }

    #[test]
    fn write_then_read_roundtrip() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        r.write(Value::Integer(7)).unwrap();
        assert_eq!(r.read().unwrap(), Value::Integer(7));
    }

    #[test]
    fn negative_array_index_from_end() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        r.write(Value::Array(Rc::new(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]))).unwrap();
        let mut sub = r.clone();
        sub.push_array_index(-1);
        assert_eq!(sub.read().unwrap(), Value::Integer(3));
    }

    #[test]
    fn write_auto_extends_array() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        r.write(Value::Array(Rc::new(vec![]))).unwrap();
        let mut sub = r.clone();
        sub.push_array_index(3);
        sub.write(Value::Integer(9)).unwrap();
        assert_eq!(r.read().unwrap(), Value::Array(Rc::new(vec![Value::Null, Value::Null, Value::Null, Value::Integer(9)])));
    }

    #[test]
    fn out_of_range_array_read_yields_null() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        r.write(Value::Array(Rc::new(vec![Value::Integer(1)]))).unwrap();
        let mut sub = r.clone();
        sub.push_array_index(100);
        assert_eq!(sub.read().unwrap(), Value::Null);
    }

    #[test]
    fn missing_object_key_read_yields_null() {
        let handle = Variable::new(true).handle();
        let r = Reference::from_variable(handle);
        r.write(Value::Object(Rc::new(Object::new()))).unwrap();
        let mut sub = r.clone();
        sub.push_object_key(crate::bytestring::ByteString::from("absent"));
        assert_eq!(sub.read().unwrap(), Value::Null);
    }

    #[test]
    fn write_to_immutable_fails() {
        let handle = Variable::new(true).handle();
        handle.borrow_mut().initialize(Value::Integer(1));
        handle.borrow_mut().set_immutable(true);
        let r = Reference::from_variable(handle);
        assert!(r.write(Value::Integer(2)).is_err());
    }
}
