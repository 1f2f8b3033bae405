//! Tail Call Record (spec §3 component G, §4.G): the token a call in
//! proper-tail-call position produces instead of actually recursing.
//!
//! The drain loop that consumes these (`finish_call`) lives in
//! [`crate::air`], next to the function-invocation logic it repeatedly
//! re-enters; this module only owns the record's shape.

use crate::function::Function;
use crate::reference::Reference;
use asteria_core::SourceLocation;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct TailCallRecord {
    pub location: SourceLocation,
    pub caller_signature: String,
    pub target: Rc<Function>,
    pub args: Vec<Reference>,
    pub this_value: Reference,
}
