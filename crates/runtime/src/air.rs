//! AIR (Asteria Intermediate Representation): the flat instruction stream
//! the compiler lowers an AST into and this executor walks (spec §3/§4.E).
//!
//! Every node's `execute` conceptually returns one of the five
//! [`Status`] values; here that contract is realised as one recursive
//! `execute_queue` walking a `Vec<AirNode>`, since Rust has no cheaper
//! way to express "this is secretly a flat array of opcodes" while still
//! getting real enum exhaustiveness checking on control-flow nodes.

use crate::bytestring::ByteString;
use crate::context::{is_reserved_name, ExecutiveContext};
use crate::eval_stack::EvaluationStack;
use crate::exception::{Exception, FrameType};
use crate::function::Function;
use crate::global_context::GlobalContext;
use crate::object::Object;
use crate::reference::Reference;
use crate::tail_call::TailCallRecord;
use crate::value::{self, Compare, Value};
use asteria_core::limits::MAX_RECURSION_DEPTH;
use asteria_core::{ErrorKind, Fault, SourceLocation};
use std::rc::Rc;
use tracing::{debug, trace};

/// A shared, cheaply-cloned instruction stream. `Rc` so a function
/// literal's captured body and a loop's body sub-stream can be cloned
/// without copying the node vector.
#[derive(Debug, Clone, Default)]
pub struct AirQueue(Rc<Vec<AirNode>>);

impl AirQueue {
    pub fn new() -> Self {
        AirQueue(Rc::new(Vec::new()))
    }

    pub fn from_nodes(nodes: Vec<AirNode>) -> Self {
        AirQueue(Rc::new(nodes))
    }

    pub fn nodes(&self) -> &[AirNode] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
    Not,
    BitNot,
    CountOf,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// What kind of `break`/`continue` a jump targets (spec §4.E): `Unspec`
/// is consumed by the innermost loop or switch; `Switch` only by a
/// switch; `While`/`For` only by the named loop kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Unspec,
    Switch,
    While,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueKind {
    Unspec,
    While,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    While,
    For,
}

/// The five statuses spec §4.E defines for `execute(ctx) -> Status`.
pub enum Status {
    Next,
    Return(Reference),
    Break(BreakKind),
    Continue(ContinueKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// `[lo, hi]`
    Closed,
    /// `[lo, hi)`
    HalfOpenRight,
    /// `(lo, hi]`
    HalfOpenLeft,
    /// `(lo, hi)`
    Open,
}

#[derive(Debug, Clone)]
pub enum SwitchClause {
    Default { locals: Vec<ByteString>, body: AirQueue },
    Value { cond: AirQueue, locals: Vec<ByteString>, body: AirQueue },
    Range { lo: AirQueue, hi: AirQueue, kind: IntervalKind, locals: Vec<ByteString>, body: AirQueue },
}

#[derive(Debug, Clone)]
pub enum AirNode {
    PushConstant(Value),
    PushLocalRef(ByteString, SourceLocation),
    PushThis,
    Pop,
    Dup,

    /// `var`/`const` declaration: pops an initializer if `has_init`,
    /// creates a GC-managed variable, binds `name` in the current scope.
    Declare { name: ByteString, immutable: bool, has_init: bool },

    /// Appends one subscript, popping the index value (and, if
    /// `computed`, the base reference) off the stack; pushes the
    /// extended reference.
    Subscript,

    Unary(UnaryOperator, SourceLocation),
    Binary(BinaryOperator, SourceLocation),
    /// `&&`/`||`: pops the already-evaluated lhs, short-circuits without
    /// running `rhs` when the result is already determined.
    ShortCircuit { is_and: bool, rhs: AirQueue },
    /// Expression-level `cond ? a : b`; unlike `If`, leaves exactly one
    /// value reference on the stack instead of returning a `Status`.
    Ternary { cond: AirQueue, then_value: AirQueue, else_value: AirQueue },
    Assign,
    CompoundAssign(BinaryOperator, SourceLocation),
    Unset,

    /// Builds an array value from the top `count` stack entries.
    MakeArray(usize),
    /// Builds an object value from the top `count` key/value stack pairs
    /// (value then key pushed per entry, so `2*count` references).
    MakeObject(Vec<ByteString>),

    Block(AirQueue),
    If { cond: AirQueue, then_branch: AirQueue, else_branch: AirQueue },
    While { cond: AirQueue, body: AirQueue },
    DoWhile { body: AirQueue, cond: AirQueue },
    For { init: AirQueue, cond: AirQueue, step: AirQueue, body: AirQueue },
    ForEach { collection: AirQueue, key_name: Option<ByteString>, value_name: ByteString, body: AirQueue },
    Switch { control: AirQueue, clauses: Vec<SwitchClause> },

    TryCatch { try_body: AirQueue, catch_name: ByteString, catch_body: AirQueue },
    Defer(AirQueue),
    Throw(SourceLocation),
    Assert { message: Option<String>, location: SourceLocation },

    /// `tail` call sites push a pending-tail-call reference instead of
    /// invoking (spec §4.G); non-tail sites invoke and drain in place.
    Call { arg_count: usize, tail: bool, location: SourceLocation },
    FunctionDefine { name: ByteString, params: Vec<ByteString>, variadic: bool, body: AirQueue, location: SourceLocation },
    Return { by_ref: bool },
    Break(BreakKind),
    Continue(ContinueKind),
}

struct ExecState<'a> {
    global: &'a mut GlobalContext,
    stack: &'a mut EvaluationStack,
    depth: usize,
}

/// Runs a top-level instruction stream (a whole script, or one REPL
/// input) against a fresh function-kind root context. Used by the
/// compiler crate's Simple Script Facade; not itself a function call, so
/// it bypasses `invoke_once`'s tail-call bookkeeping.
pub fn execute_top_level(global: &mut GlobalContext, queue: &AirQueue) -> Result<Value, Exception> {
    let ctx = ExecutiveContext::new_function(None, None);
    let mut stack = EvaluationStack::new();
    let mut state = ExecState { global, stack: &mut stack, depth: 0 };
    let result = execute_queue(queue, &ctx, &mut state);
    for deferred in ctx.take_defers() {
        execute_queue(&deferred, &ctx, &mut state)?;
    }
    match result? {
        Status::Return(r) => finish_call(state.global, r)?.read().map_err(|f| exception_at(f, &SourceLocation::native())),
        Status::Next => Ok(Value::Null),
        Status::Break(_) | Status::Continue(_) => Err(exception_at(
            Fault::new(ErrorKind::Runtime, "unmatched break/continue at top level"),
            &SourceLocation::native(),
        )),
    }
}

pub fn execute_function_call(
    global: &mut GlobalContext,
    target: Rc<Function>,
    this_value: Reference,
    args: Vec<Reference>,
) -> Result<Reference, Exception> {
    let record = TailCallRecord {
        location: target.location().clone(),
        caller_signature: "<native entry>".to_string(),
        target,
        args,
        this_value,
    };
    let mut stack = EvaluationStack::new();
    let mut state = ExecState { global, stack: &mut stack, depth: 0 };
    let pending = invoke_once(&mut state, &record)?;
    finish_call(state.global, pending)
}

/// Drains a chain of pending tail calls (spec §4.G): the only place
/// genuine host-stack recursion happens is inside `invoke_once`, called
/// once per loop iteration here rather than once per tail call.
fn finish_call(global: &mut GlobalContext, mut reference: Reference) -> Result<Reference, Exception> {
    let mut stack = EvaluationStack::new();
    let mut chained = 0;
    while reference.is_tail_call_pending() {
        let record = reference.into_tail_call_record();
        trace!("draining tail call #{chained} into {}", record.target.signature());
        let mut state = ExecState { global, stack: &mut stack, depth: 0 };
        reference = invoke_once(&mut state, &record)?;
        chained += 1;
    }
    Ok(reference)
}

fn invoke_once(state: &mut ExecState, record: &TailCallRecord) -> Result<Reference, Exception> {
    if let Some(native) = record.target.native() {
        return native(state.global, record.this_value.clone(), record.args.clone());
    }

    let params = record.target.params();
    let variadic = record.target.is_variadic();
    if record.args.len() < params.len() || (!variadic && record.args.len() > params.len()) {
        return Err(exception_at(
            Fault::new(
                ErrorKind::TypeMismatch,
                format!(
                    "`{}` expects {} argument(s), got {}",
                    record.target.signature(),
                    params.len(),
                    record.args.len()
                ),
            ),
            &record.location,
        ));
    }

    let parent_ctx = record.target.captured_context().cloned();
    let frame = ExecutiveContext::new_function(parent_ctx, Some(record.this_value.clone()));
    for (name, arg_ref) in params.iter().zip(record.args.iter()) {
        frame.declare(name.clone(), arg_ref.clone());
    }
    if variadic {
        let extra: Vec<Value> = record.args[params.len()..]
            .iter()
            .map(Reference::read)
            .collect::<Result<_, _>>()
            .map_err(|f| exception_at(f, &record.location))?;
        frame.declare(ByteString::from("__varg"), Reference::constant(Value::Array(Rc::new(extra))));
    }
    frame.declare(ByteString::from("__file"), Reference::constant(Value::string_from_static(record.target.location().file())));
    frame.declare(ByteString::from("__line"), Reference::constant(Value::Integer(record.target.location().line())));
    frame.declare(ByteString::from("__func"), Reference::constant(Value::String(record.target.name().clone())));

    let body = record.target.air().expect("scripted function has an AIR body");
    let mut inner_state = ExecState { global: state.global, stack: state.stack, depth: state.depth + 1 };
    if inner_state.depth > MAX_RECURSION_DEPTH {
        return Err(exception_at(
            Fault::new(ErrorKind::Runtime, "maximum call depth exceeded"),
            &record.location,
        ));
    }

    debug!("entering scope {} at depth {}", record.target.signature(), inner_state.depth);
    let result = execute_queue(body, &frame, &mut inner_state);
    debug!("exiting scope {} at depth {}", record.target.signature(), inner_state.depth);
    for deferred in frame.take_defers() {
        execute_queue(&deferred, &frame, &mut inner_state).map_err(|mut e| {
            e.push_frame(FrameType::FunctionCall, record.location.clone());
            e
        })?;
    }

    match result {
        Ok(Status::Return(r)) => Ok(r),
        Ok(Status::Next) => Ok(Reference::constant(Value::Null)),
        Ok(Status::Break(_)) | Ok(Status::Continue(_)) => {
            Err(exception_at(Fault::new(ErrorKind::Runtime, "unmatched break/continue escaping a function frame"), &record.location))
        }
        Err(mut e) => {
            e.push_frame(FrameType::FunctionCall, record.location.clone());
            Err(e)
        }
    }
}

fn exception_at(fault: Fault, location: &SourceLocation) -> Exception {
    let mut exc = Exception::new(Value::string_from_static(&fault.message));
    exc.push_frame(FrameType::Native, fault.location.unwrap_or_else(|| location.clone()));
    exc
}

pub fn execute_queue(queue: &AirQueue, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    for node in queue.nodes() {
        match execute_node(node, ctx, state)? {
            Status::Next => continue,
            other => return Ok(other),
        }
    }
    Ok(Status::Next)
}

/// Runs a block body against an already-built block context, then drains
/// *that context's own* defer stack before returning (spec §4.E/§5: a
/// `defer` fires on exit of the lexical scope that registered it, not
/// only at the enclosing function's return).
fn run_block_body(body: &AirQueue, block_ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    let result = execute_queue(body, block_ctx, state);
    for deferred in block_ctx.take_defers() {
        execute_queue(&deferred, block_ctx, state)?;
    }
    result
}

/// Convenience wrapper over [`run_block_body`] for the common case of a
/// fresh child block with no bindings to pre-populate.
fn execute_scoped(body: &AirQueue, parent: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    let block_ctx = ExecutiveContext::new_block(parent.clone());
    run_block_body(body, &block_ctx, state)
}

fn execute_node(node: &AirNode, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    match node {
        AirNode::PushConstant(v) => {
            state.stack.push(Reference::constant(v.clone()));
        }
        AirNode::PushLocalRef(name, loc) => {
            let r = ctx
                .lookup(name)
                .or_else(|| state.global.get_named_reference_opt(name))
                .ok_or_else(|| exception_at(Fault::new(ErrorKind::NotInitialized, format!("undeclared name `{name}`")), loc))?;
            state.stack.push(r);
        }
        AirNode::PushThis => {
            state.stack.push(ctx.find_this().unwrap_or_else(|| Reference::constant(Value::Null)));
        }
        AirNode::Pop => {
            state.stack.pop();
        }
        AirNode::Dup => {
            let top = state.stack.peek(0).clone();
            state.stack.push(top);
        }
        AirNode::Declare { name, immutable, has_init } => {
            let init = if *has_init { Some(state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?) } else { None };
            if is_reserved_name(name.to_string().as_str()) {
                return Err(exception_at(Fault::new(ErrorKind::TypeMismatch, format!("`{name}` is a reserved name")), &SourceLocation::native()));
            }
            let handle = state.global.create_variable(0);
            if let Some(v) = init {
                handle.borrow_mut().initialize(v);
            }
            handle.borrow_mut().set_immutable(*immutable);
            ctx.declare(name.clone(), Reference::from_variable(handle));
        }
        AirNode::Subscript => {
            let index_val = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
            let mut base = state.stack.pop();
            match index_val {
                Value::Integer(i) => base.push_array_index(i),
                Value::String(s) => base.push_object_key(s),
                other => {
                    return Err(exception_at(
                        Fault::new(ErrorKind::TypeMismatch, format!("cannot subscript with a `{}`", other.type_name())),
                        &SourceLocation::native(),
                    ))
                }
            }
            state.stack.push(base);
        }
        AirNode::Unary(op, loc) => {
            let operand = state.stack.pop();
            let result = eval_unary(*op, &operand, loc)?;
            state.stack.push(result);
        }
        AirNode::Binary(op, loc) => {
            let rhs = state.stack.pop().read().map_err(|f| exception_at(f, loc))?;
            let lhs = state.stack.pop().read().map_err(|f| exception_at(f, loc))?;
            let result = eval_binary(*op, &lhs, &rhs).map_err(|f| exception_at(f, loc))?;
            state.stack.push(Reference::constant(result));
        }
        AirNode::ShortCircuit { is_and, rhs } => {
            let lhs_val = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
            if *is_and && !lhs_val.test() {
                state.stack.push(Reference::constant(Value::Boolean(false)));
            } else if !*is_and && lhs_val.test() {
                state.stack.push(Reference::constant(Value::Boolean(true)));
            } else {
                let rhs_ctx = ExecutiveContext::new_block(ctx.clone());
                run_to_value(rhs, &rhs_ctx, state)?;
                let rhs_val = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
                state.stack.push(Reference::constant(Value::Boolean(rhs_val.test())));
            }
        }
        AirNode::Ternary { cond, then_value, else_value } => {
            let cond_ctx = ExecutiveContext::new_block(ctx.clone());
            run_to_value(cond, &cond_ctx, state)?;
            let taken = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?.test();
            let branch = if taken { then_value } else { else_value };
            let branch_ctx = ExecutiveContext::new_block(ctx.clone());
            run_to_value(branch, &branch_ctx, state)?;
        }
        AirNode::Assign => {
            let rhs = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
            let lhs = state.stack.pop();
            lhs.write(rhs).map_err(|f| exception_at(f, &SourceLocation::native()))?;
            state.stack.push(lhs);
        }
        AirNode::CompoundAssign(op, loc) => {
            let rhs = state.stack.pop().read().map_err(|f| exception_at(f, loc))?;
            let lhs = state.stack.pop();
            lhs.read_mutable(|slot| {
                let updated = eval_binary(*op, slot, &rhs)?;
                *slot = updated;
                Ok(())
            })
            .map_err(|f| exception_at(f, loc))?;
            state.stack.push(lhs);
        }
        AirNode::Unset => {
            let target = state.stack.pop();
            let old = target.unset().map_err(|f| exception_at(f, &SourceLocation::native()))?;
            state.stack.push(Reference::constant(old));
        }
        AirNode::MakeArray(count) => {
            let items = state
                .stack
                .pop_n(*count)
                .into_iter()
                .map(|r| r.read())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|f| exception_at(f, &SourceLocation::native()))?;
            state.stack.push(Reference::constant(Value::Array(Rc::new(items))));
        }
        AirNode::MakeObject(keys) => {
            let values = state
                .stack
                .pop_n(keys.len())
                .into_iter()
                .map(|r| r.read())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|f| exception_at(f, &SourceLocation::native()))?;
            let mut obj = Object::new();
            for (key, value) in keys.iter().zip(values) {
                obj.insert(key.clone(), value);
            }
            state.stack.push(Reference::constant(Value::Object(Rc::new(obj))));
        }
        AirNode::Block(body) => {
            return execute_scoped(body, ctx, state);
        }
        AirNode::If { cond, then_branch, else_branch } => {
            let cond_ctx = ExecutiveContext::new_block(ctx.clone());
            run_to_value(cond, &cond_ctx, state)?;
            let taken = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?.test();
            let branch = if taken { then_branch } else { else_branch };
            return execute_scoped(branch, ctx, state);
        }
        AirNode::While { cond, body } => return run_while(cond, body, ctx, state),
        AirNode::DoWhile { body, cond } => return run_do_while(body, cond, ctx, state),
        AirNode::For { init, cond, step, body } => return run_for(init, cond, step, body, ctx, state),
        AirNode::ForEach { collection, key_name, value_name, body } => {
            return run_for_each(collection, key_name.as_ref(), value_name, body, ctx, state)
        }
        AirNode::Switch { control, clauses } => return run_switch(control, clauses, ctx, state),
        AirNode::TryCatch { try_body, catch_name, catch_body } => return run_try_catch(try_body, catch_name, catch_body, ctx, state),
        AirNode::Defer(body) => ctx.push_defer(body.clone()),
        AirNode::Throw(loc) => {
            let payload = state.stack.pop().read().map_err(|f| exception_at(f, loc))?;
            let mut exc = Exception::new(payload);
            exc.push_frame(FrameType::ThrowSite, loc.clone());
            return Err(exc);
        }
        AirNode::Assert { message, location } => {
            let ok = state.stack.pop().read().map_err(|f| exception_at(f, location))?.test();
            if !ok {
                let msg = message.clone().unwrap_or_else(|| "assertion failed".to_string());
                return Err(exception_at(Fault::new(ErrorKind::Assertion, msg), location));
            }
        }
        AirNode::Call { arg_count, tail, location } => {
            let args = state.stack.pop_n(*arg_count);
            let callee_ref = state.stack.pop();
            let callee_val = finish_call(state.global, callee_ref)?
                .read()
                .map_err(|f| exception_at(f, location))?;
            let func = callee_val.as_function().map_err(|f| exception_at(f, location))?.clone();
            let this_ref = ctx.find_this().unwrap_or_else(|| Reference::constant(Value::Null));
            let record = TailCallRecord {
                location: location.clone(),
                caller_signature: func.signature(),
                target: func,
                args,
                this_value: this_ref,
            };
            if *tail {
                state.stack.push(Reference::from_tail_call(record));
            } else {
                let pending = invoke_once(state, &record)?;
                let finished = finish_call(state.global, pending)?;
                state.stack.push(finished);
            }
        }
        AirNode::FunctionDefine { name, params, variadic, body, location } => {
            let func = Function::new_scripted(name.clone(), params.clone(), *variadic, body.clone(), Some(ctx.clone()), location.clone());
            state.stack.push(Reference::constant(Value::Function(func)));
        }
        AirNode::Return { by_ref } => {
            let top = state.stack.pop();
            let result = if *by_ref || top.is_tail_call_pending() {
                top
            } else {
                let v = top.read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
                Reference::constant(v)
            };
            return Ok(Status::Return(result));
        }
        AirNode::Break(kind) => return Ok(Status::Break(*kind)),
        AirNode::Continue(kind) => return Ok(Status::Continue(*kind)),
    }
    Ok(Status::Next)
}

fn eval_unary(op: UnaryOperator, operand: &Reference, loc: &SourceLocation) -> Result<Reference, Exception> {
    let v = operand.read().map_err(|f| exception_at(f, loc))?;
    match op {
        UnaryOperator::Neg => value::value_neg(&v).map(Reference::constant).map_err(|f| exception_at(f, loc)),
        UnaryOperator::Not => Ok(Reference::constant(Value::Boolean(!v.test()))),
        UnaryOperator::BitNot => match v {
            Value::Integer(i) => Ok(Reference::constant(Value::Integer(!i))),
            Value::Boolean(b) => Ok(Reference::constant(Value::Boolean(!b))),
            other => Err(exception_at(Fault::new(ErrorKind::TypeMismatch, format!("`!` is not defined for `{}`", other.type_name())), loc)),
        },
        UnaryOperator::CountOf => {
            let n = match &v {
                Value::String(s) => s.len() as i64,
                Value::Array(a) => a.len() as i64,
                Value::Object(o) => o.len() as i64,
                Value::Null => 0,
                other => return Err(exception_at(Fault::new(ErrorKind::TypeMismatch, format!("`countof` is not defined for `{}`", other.type_name())), loc)),
            };
            Ok(Reference::constant(Value::Integer(n)))
        }
        UnaryOperator::TypeOf => Ok(Reference::constant(Value::string_from_static(v.type_name()))),
    }
}

fn eval_binary(op: BinaryOperator, lhs: &Value, rhs: &Value) -> Result<Value, Fault> {
    match op {
        BinaryOperator::Add => value::value_add(lhs, rhs),
        BinaryOperator::Sub => value::value_sub(lhs, rhs),
        BinaryOperator::Mul => value::value_mul(lhs, rhs),
        BinaryOperator::Div => value::value_div(lhs, rhs),
        BinaryOperator::Rem => value::value_rem(lhs, rhs),
        BinaryOperator::Shl => value::value_shl(lhs, rhs),
        BinaryOperator::Shr => value::value_shr(lhs, rhs),
        BinaryOperator::Lt => Ok(Value::Boolean(lhs.compare(rhs) == Compare::Less)),
        BinaryOperator::Le => Ok(Value::Boolean(matches!(lhs.compare(rhs), Compare::Less | Compare::Equal))),
        BinaryOperator::Gt => Ok(Value::Boolean(lhs.compare(rhs) == Compare::Greater)),
        BinaryOperator::Ge => Ok(Value::Boolean(matches!(lhs.compare(rhs), Compare::Greater | Compare::Equal))),
        BinaryOperator::Eq => Ok(Value::Boolean(lhs.compare(rhs) == Compare::Equal)),
        BinaryOperator::Ne => Ok(Value::Boolean(lhs.compare(rhs) != Compare::Equal)),
    }
}

fn run_to_value(queue: &AirQueue, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    execute_queue(queue, ctx, state)
}

fn run_while(cond: &AirQueue, body: &AirQueue, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    loop {
        let cond_ctx = ExecutiveContext::new_block(ctx.clone());
        run_to_value(cond, &cond_ctx, state)?;
        let keep_going = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?.test();
        if !keep_going {
            break;
        }
        match execute_scoped(body, ctx, state)? {
            Status::Next => {}
            Status::Break(k) if consumes_loop_break(k) => break,
            Status::Continue(k) if consumes_loop_continue(k, LoopKind::While) => {}
            other => return Ok(other),
        }
    }
    Ok(Status::Next)
}

fn run_do_while(body: &AirQueue, cond: &AirQueue, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    loop {
        match execute_scoped(body, ctx, state)? {
            Status::Next => {}
            Status::Break(k) if consumes_loop_break(k) => break,
            Status::Continue(k) if consumes_loop_continue(k, LoopKind::While) => {}
            other => return Ok(other),
        }
        let cond_ctx = ExecutiveContext::new_block(ctx.clone());
        run_to_value(cond, &cond_ctx, state)?;
        let keep_going = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?.test();
        if !keep_going {
            break;
        }
    }
    Ok(Status::Next)
}

fn run_for(init: &AirQueue, cond: &AirQueue, step: &AirQueue, body: &AirQueue, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    let for_ctx = ExecutiveContext::new_block(ctx.clone());
    execute_queue(init, &for_ctx, state)?;
    loop {
        if !cond.nodes().is_empty() {
            run_to_value(cond, &for_ctx, state)?;
            let keep_going = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?.test();
            if !keep_going {
                break;
            }
        }
        match execute_scoped(body, &for_ctx, state)? {
            Status::Next => {}
            Status::Break(k) if consumes_loop_break(k) => break,
            Status::Continue(k) if consumes_loop_continue(k, LoopKind::For) => {}
            other => return Ok(other),
        }
        execute_queue(step, &for_ctx, state)?;
    }
    Ok(Status::Next)
}

fn run_for_each(
    collection: &AirQueue,
    key_name: Option<&ByteString>,
    value_name: &ByteString,
    body: &AirQueue,
    ctx: &Rc<ExecutiveContext>,
    state: &mut ExecState,
) -> Result<Status, Exception> {
    let outer_ctx = ExecutiveContext::new_block(ctx.clone());
    run_to_value(collection, &outer_ctx, state)?;
    let subject = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;

    macro_rules! drive_entry {
        ($key:expr, $value:expr) => {{
            let iter_ctx = ExecutiveContext::new_block(outer_ctx.clone());
            if let Some(key_name) = key_name {
                iter_ctx.declare(key_name.clone(), Reference::constant($key));
            }
            iter_ctx.declare(value_name.clone(), Reference::constant($value));
            match run_block_body(body, &iter_ctx, state)? {
                Status::Next => {}
                Status::Break(k) if consumes_loop_break(k) => return Ok(Status::Next),
                Status::Continue(k) if consumes_loop_continue(k, LoopKind::For) => {}
                other => return Ok(other),
            }
        }};
    }

    match subject {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                drive_entry!(Value::Integer(i as i64), item.clone());
            }
        }
        Value::Object(obj) => {
            for (key, value) in obj.iter() {
                drive_entry!(Value::String(key.clone()), value.clone());
            }
        }
        Value::Null => {}
        other => {
            return Err(exception_at(
                Fault::new(ErrorKind::TypeMismatch, format!("cannot iterate a `{}`", other.type_name())),
                &SourceLocation::native(),
            ))
        }
    }
    Ok(Status::Next)
}

fn run_switch(control: &AirQueue, clauses: &[SwitchClause], ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    let switch_ctx = ExecutiveContext::new_block(ctx.clone());
    let result = run_switch_body(control, clauses, &switch_ctx, state);
    for deferred in switch_ctx.take_defers() {
        execute_queue(&deferred, &switch_ctx, state)?;
    }
    result
}

fn run_switch_body(control: &AirQueue, clauses: &[SwitchClause], switch_ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Status, Exception> {
    run_to_value(control, switch_ctx, state)?;
    let subject = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;

    let matched_index = find_matching_clause(clauses, &subject, switch_ctx, state)?;
    let Some(start) = matched_index else { return Ok(Status::Next) };

    for clause in &clauses[..start] {
        for name in clause_locals(clause) {
            switch_ctx.declare(name.clone(), Reference::constant(Value::Null));
        }
    }
    for clause in &clauses[start..] {
        match execute_queue(clause_body(clause), switch_ctx, state)? {
            Status::Next => continue,
            Status::Break(k) if consumes_switch_break(k) => return Ok(Status::Next),
            other => return Ok(other),
        }
    }
    Ok(Status::Next)
}

fn find_matching_clause(clauses: &[SwitchClause], subject: &Value, ctx: &Rc<ExecutiveContext>, state: &mut ExecState) -> Result<Option<usize>, Exception> {
    let mut default_index = None;
    for (i, clause) in clauses.iter().enumerate() {
        match clause {
            SwitchClause::Default { .. } => default_index = Some(i),
            SwitchClause::Value { cond, .. } => {
                run_to_value(cond, ctx, state)?;
                let candidate = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
                if subject.compare(&candidate) == Compare::Equal {
                    return Ok(Some(i));
                }
            }
            SwitchClause::Range { lo, hi, kind, .. } => {
                run_to_value(lo, ctx, state)?;
                let lo_v = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
                run_to_value(hi, ctx, state)?;
                let hi_v = state.stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?;
                if interval_contains(subject, &lo_v, &hi_v, *kind) {
                    return Ok(Some(i));
                }
            }
        }
    }
    Ok(default_index)
}

fn interval_contains(x: &Value, lo: &Value, hi: &Value, kind: IntervalKind) -> bool {
    let above_lo = match kind {
        IntervalKind::Closed | IntervalKind::HalfOpenRight => matches!(x.compare(lo), Compare::Greater | Compare::Equal),
        IntervalKind::HalfOpenLeft | IntervalKind::Open => x.compare(lo) == Compare::Greater,
    };
    let below_hi = match kind {
        IntervalKind::Closed | IntervalKind::HalfOpenLeft => matches!(x.compare(hi), Compare::Less | Compare::Equal),
        IntervalKind::HalfOpenRight | IntervalKind::Open => x.compare(hi) == Compare::Less,
    };
    above_lo && below_hi
}

fn clause_locals(clause: &SwitchClause) -> &[ByteString] {
    match clause {
        SwitchClause::Default { locals, .. } => locals,
        SwitchClause::Value { locals, .. } => locals,
        SwitchClause::Range { locals, .. } => locals,
    }
}

fn clause_body(clause: &SwitchClause) -> &AirQueue {
    match clause {
        SwitchClause::Default { body, .. } => body,
        SwitchClause::Value { body, .. } => body,
        SwitchClause::Range { body, .. } => body,
    }
}

fn run_try_catch(
    try_body: &AirQueue,
    catch_name: &ByteString,
    catch_body: &AirQueue,
    ctx: &Rc<ExecutiveContext>,
    state: &mut ExecState,
) -> Result<Status, Exception> {
    let try_ctx = ExecutiveContext::new_block(ctx.clone());
    match run_block_body(try_body, &try_ctx, state) {
        Ok(status) => Ok(status),
        Err(mut exc) => {
            exc.push_frame(FrameType::CatchSite, SourceLocation::native());
            let catch_ctx = ExecutiveContext::new_block(ctx.clone());
            let backtrace = exc.backtrace_array();
            catch_ctx.declare(catch_name.clone(), Reference::constant(exc.value.clone()));
            catch_ctx.declare(ByteString::from("__backtrace"), Reference::constant(backtrace));
            run_block_body(catch_body, &catch_ctx, state)
        }
    }
}

fn consumes_loop_break(kind: BreakKind) -> bool {
    matches!(kind, BreakKind::Unspec | BreakKind::While | BreakKind::For)
}

fn consumes_loop_continue(kind: ContinueKind, loop_kind: LoopKind) -> bool {
    match (kind, loop_kind) {
        (ContinueKind::Unspec, _) => true,
        (ContinueKind::While, LoopKind::While) => true,
        (ContinueKind::For, LoopKind::For) => true,
        _ => false,
    }
}

fn consumes_switch_break(kind: BreakKind) -> bool {
    matches!(kind, BreakKind::Unspec | BreakKind::Switch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(nodes: Vec<AirNode>) -> Result<Value, Exception> {
        let mut global = GlobalContext::new();
        let ctx = ExecutiveContext::new_function(None, None);
        let mut stack = EvaluationStack::new();
        let mut state = ExecState { global: &mut global, stack: &mut stack, depth: 0 };
        let queue = AirQueue::from_nodes(nodes);
        match execute_queue(&queue, &ctx, &mut state)? {
            Status::Return(r) => r.read().map_err(|f| exception_at(f, &SourceLocation::native())),
            _ => Ok(stack.pop().read().map_err(|f| exception_at(f, &SourceLocation::native()))?),
        }
    }

    #[test]
    fn arithmetic_and_assert() {
        let nodes = vec![
            AirNode::PushConstant(Value::Integer(2)),
            AirNode::PushConstant(Value::Integer(3)),
            AirNode::Binary(BinaryOperator::Add, SourceLocation::native()),
            AirNode::PushConstant(Value::Integer(5)),
            AirNode::Binary(BinaryOperator::Eq, SourceLocation::native()),
            AirNode::Assert { message: Some("2+3==5".into()), location: SourceLocation::native() },
            AirNode::PushConstant(Value::Boolean(true)),
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn declare_and_mutate_variable() {
        let nodes = vec![
            AirNode::PushConstant(Value::Integer(1)),
            AirNode::Declare { name: ByteString::from("x"), immutable: false, has_init: true },
            AirNode::PushLocalRef(ByteString::from("x"), SourceLocation::native()),
            AirNode::PushConstant(Value::Integer(41)),
            AirNode::CompoundAssign(BinaryOperator::Add, SourceLocation::native()),
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Integer(42));
    }

    #[test]
    fn while_loop_with_break() {
        let nodes = vec![
            AirNode::PushConstant(Value::Integer(0)),
            AirNode::Declare { name: ByteString::from("i"), immutable: false, has_init: true },
            AirNode::While {
                cond: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Boolean(true))]),
                body: AirQueue::from_nodes(vec![
                    AirNode::PushLocalRef(ByteString::from("i"), SourceLocation::native()),
                    AirNode::PushConstant(Value::Integer(1)),
                    AirNode::CompoundAssign(BinaryOperator::Add, SourceLocation::native()),
                    AirNode::Pop,
                    AirNode::PushLocalRef(ByteString::from("i"), SourceLocation::native()),
                    AirNode::PushConstant(Value::Integer(5)),
                    AirNode::Binary(BinaryOperator::Ge, SourceLocation::native()),
                    AirNode::If {
                        cond: AirQueue::from_nodes(vec![]),
                        then_branch: AirQueue::from_nodes(vec![AirNode::Break(BreakKind::Unspec)]),
                        else_branch: AirQueue::from_nodes(vec![]),
                    },
                ]),
            },
            AirNode::PushLocalRef(ByteString::from("i"), SourceLocation::native()),
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Integer(5));
    }

    #[test]
    fn for_each_over_array_preserves_order() {
        let nodes = vec![
            AirNode::PushConstant(Value::Integer(0)),
            AirNode::Declare { name: ByteString::from("sum"), immutable: false, has_init: true },
            AirNode::ForEach {
                collection: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Array(Rc::new(vec![
                    Value::Integer(1),
                    Value::Integer(2),
                    Value::Integer(3),
                ])))]),
                key_name: None,
                value_name: ByteString::from("v"),
                body: AirQueue::from_nodes(vec![
                    AirNode::PushLocalRef(ByteString::from("sum"), SourceLocation::native()),
                    AirNode::PushLocalRef(ByteString::from("v"), SourceLocation::native()),
                    AirNode::CompoundAssign(BinaryOperator::Add, SourceLocation::native()),
                    AirNode::Pop,
                ]),
            },
            AirNode::PushLocalRef(ByteString::from("sum"), SourceLocation::native()),
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Integer(6));
    }

    #[test]
    fn try_catch_binds_thrown_value_type() {
        let nodes = vec![
            AirNode::TryCatch {
                try_body: AirQueue::from_nodes(vec![
                    AirNode::PushConstant(Value::string_from_static("boom")),
                    AirNode::Throw(SourceLocation::native()),
                ]),
                catch_name: ByteString::from("e"),
                catch_body: AirQueue::from_nodes(vec![
                    AirNode::PushLocalRef(ByteString::from("e"), SourceLocation::native()),
                    AirNode::Unary(UnaryOperator::TypeOf, SourceLocation::native()),
                    AirNode::Return { by_ref: false },
                ]),
            },
        ];
        assert_eq!(run(nodes).unwrap(), Value::string_from_static("string"));
    }

    #[test]
    fn logical_and_short_circuits_without_evaluating_rhs() {
        let nodes = vec![
            AirNode::PushConstant(Value::Boolean(false)),
            AirNode::ShortCircuit {
                is_and: true,
                rhs: AirQueue::from_nodes(vec![AirNode::Throw(SourceLocation::native())]),
            },
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn logical_or_short_circuits_without_evaluating_rhs() {
        let nodes = vec![
            AirNode::PushConstant(Value::Boolean(true)),
            AirNode::ShortCircuit {
                is_and: false,
                rhs: AirQueue::from_nodes(vec![AirNode::Throw(SourceLocation::native())]),
            },
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Boolean(true));
    }

    #[test]
    fn logical_and_evaluates_rhs_when_lhs_truthy() {
        let nodes = vec![
            AirNode::PushConstant(Value::Boolean(true)),
            AirNode::ShortCircuit {
                is_and: true,
                rhs: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Boolean(false))]),
            },
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Boolean(false));
    }

    #[test]
    fn ternary_selects_matching_branch() {
        let nodes = vec![
            AirNode::Ternary {
                cond: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Boolean(false))]),
                then_value: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Integer(1))]),
                else_value: AirQueue::from_nodes(vec![AirNode::PushConstant(Value::Integer(2))]),
            },
            AirNode::Return { by_ref: false },
        ];
        assert_eq!(run(nodes).unwrap(), Value::Integer(2));
    }

    #[test]
    fn function_frame_exposes_file_line_and_func() {
        let mut global = GlobalContext::new();
        let body = AirQueue::from_nodes(vec![
            AirNode::PushLocalRef(ByteString::from("__func"), SourceLocation::native()),
            AirNode::Return { by_ref: false },
        ]);
        let location = SourceLocation::new("script.ast".to_string(), 7);
        let target = Function::new_scripted(ByteString::from("greet"), Vec::new(), false, body, None, location);
        let result = execute_function_call(&mut global, target, Reference::constant(Value::Null), Vec::new()).unwrap();
        assert_eq!(result.read().unwrap(), Value::String(ByteString::from("greet")));
    }
}
