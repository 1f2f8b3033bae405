//! `asteria-runtime`: the execution core described in spec §3 -- the
//! `Value` system, the `Variable`/`Reference` model, the executive
//! context chain with proper tail calls, the AIR instruction executor,
//! and the generational garbage collector.
//!
//! `Value`, `Variable`, `Reference`, `Context`, `Function`, and AIR are
//! mutually recursive (a function value captures a context, which binds
//! references rooted at variables, which hold values, which may again be
//! functions) and so cannot be split across crate boundaries the way a
//! layered core/runtime workspace normally would be; only the leaf types
//! with no cycle back into this graph (`ErrorKind`, `Fault`,
//! `SourceLocation`, the numeric/recursion limits) live in the
//! lower-level `asteria-core` crate this one depends on.

pub mod air;
pub mod bytestring;
pub mod context;
pub mod eval_stack;
pub mod exception;
pub mod function;
pub mod gc;
pub mod global_context;
pub mod object;
pub mod reference;
pub mod tail_call;
pub mod value;
pub mod variable;

pub use air::{execute_function_call, execute_top_level, AirNode, AirQueue, Status};
pub use bytestring::ByteString;
pub use context::{AnalyticContext, ExecutiveContext};
pub use eval_stack::EvaluationStack;
pub use exception::{BacktraceFrame, Exception, FrameType};
pub use function::{Function, NativeFn};
pub use gc::GarbageCollector;
pub use global_context::{GlobalContext, LANGUAGE_API_VERSION};
pub use object::Object;
pub use reference::{JumpTargetKind, RefRoot, Reference, Subscript};
pub use tail_call::TailCallRecord;
pub use value::{Compare, OpaqueObject, Value};
pub use variable::{Variable, VariableHandle, VariableSet};
