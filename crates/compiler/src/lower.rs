//! AST -> AIR lowering. Each `lower_*` function appends nodes to a flat
//! `Vec<AirNode>` rather than building a tree, mirroring the shape
//! `asteria_runtime::air` actually executes. Expression lowering always
//! leaves exactly one [`Reference`](asteria_runtime::reference::Reference)
//! on the evaluation stack when it runs; statement lowering leaves none.

use crate::ast::{self, BinaryOp, Expr, IntervalKind as AstIntervalKind, Literal, Pattern, Stmt, SwitchTest, UnaryOp};
use asteria_runtime::air::{AirNode, AirQueue, BinaryOperator, BreakKind, ContinueKind, IntervalKind, SwitchClause, UnaryOperator};
use asteria_runtime::bytestring::ByteString;
use asteria_runtime::value::Value;

pub fn lower_program(program: &ast::Program) -> AirQueue {
    lower_block(program)
}

fn lower_block(stmts: &[Stmt]) -> AirQueue {
    let mut out = Vec::new();
    for stmt in stmts {
        lower_stmt(stmt, &mut out);
    }
    AirQueue::from_nodes(out)
}

fn lower_expr_queue(expr: &Expr) -> AirQueue {
    let mut out = Vec::new();
    lower_expr(expr, &mut out);
    AirQueue::from_nodes(out)
}

fn lower_opt_expr_queue(expr: Option<&Expr>) -> AirQueue {
    match expr {
        Some(e) => lower_expr_queue(e),
        None => AirQueue::from_nodes(Vec::new()),
    }
}

fn lower_stmt(stmt: &Stmt, out: &mut Vec<AirNode>) {
    match stmt {
        Stmt::Expr(e) => {
            lower_expr(e, out);
            out.push(AirNode::Pop);
        }
        Stmt::VarDecl { name, immutable, init } => {
            let has_init = init.is_some();
            if let Some(init) = init {
                lower_expr(init, out);
            }
            out.push(AirNode::Declare { name: ByteString::from(name.as_str()), immutable: *immutable, has_init });
        }
        Stmt::Destructure { pattern, immutable, init } => lower_destructure(pattern, *immutable, init, out),
        // Resolved to plain statements by the compiler's import pass before
        // lowering ever sees a program; reaching here means a caller lowered
        // an AST that skipped that pass.
        Stmt::Import(path, loc) => {
            let _ = (path, loc);
        }
        Stmt::Block(body) => out.push(AirNode::Block(lower_block(body))),
        Stmt::If { cond, then_branch, else_branch } => {
            out.push(AirNode::If { cond: lower_expr_queue(cond), then_branch: lower_block(then_branch), else_branch: lower_block(else_branch) })
        }
        Stmt::While { cond, body } => out.push(AirNode::While { cond: lower_expr_queue(cond), body: lower_block(body) }),
        Stmt::DoWhile { body, cond } => out.push(AirNode::DoWhile { body: lower_block(body), cond: lower_expr_queue(cond) }),
        Stmt::For { init, cond, step, body } => {
            let init_queue = match init.as_ref() {
                Some(stmt) => {
                    let mut nodes = Vec::new();
                    lower_stmt(stmt, &mut nodes);
                    AirQueue::from_nodes(nodes)
                }
                None => AirQueue::from_nodes(Vec::new()),
            };
            let step_queue = match step {
                Some(e) => {
                    let mut nodes = Vec::new();
                    lower_expr(e, &mut nodes);
                    nodes.push(AirNode::Pop);
                    AirQueue::from_nodes(nodes)
                }
                None => AirQueue::from_nodes(Vec::new()),
            };
            out.push(AirNode::For { init: init_queue, cond: lower_opt_expr_queue(cond.as_ref()), step: step_queue, body: lower_block(body) });
        }
        Stmt::ForEach { key_name, value_name, collection, body } => out.push(AirNode::ForEach {
            collection: lower_expr_queue(collection),
            key_name: key_name.as_ref().map(|n| ByteString::from(n.as_str())),
            value_name: ByteString::from(value_name.as_str()),
            body: lower_block(body),
        }),
        Stmt::Switch { control, arms } => {
            let clauses = arms.iter().map(lower_switch_arm).collect();
            out.push(AirNode::Switch { control: lower_expr_queue(control), clauses });
        }
        Stmt::TryCatch { try_body, catch_name, catch_body } => out.push(AirNode::TryCatch {
            try_body: lower_block(try_body),
            catch_name: ByteString::from(catch_name.as_str()),
            catch_body: lower_block(catch_body),
        }),
        Stmt::Defer(body) => out.push(AirNode::Defer(lower_block(body))),
        Stmt::Throw(e, loc) => {
            lower_expr(e, out);
            out.push(AirNode::Throw(loc.clone()));
        }
        Stmt::Assert { cond, message, location } => {
            lower_expr(cond, out);
            out.push(AirNode::Assert { message: message.clone(), location: location.clone() });
        }
        Stmt::Return { value, by_ref } => {
            match value {
                // "The sole expression in a `return expr;`" is a PTC
                // position (spec §4.G).
                Some(e) => lower_expr_in_tail_position(e, out),
                None => out.push(AirNode::PushConstant(Value::Null)),
            }
            out.push(AirNode::Return { by_ref: *by_ref });
        }
        Stmt::Break(target) => out.push(AirNode::Break(lower_break_target(*target))),
        Stmt::Continue(target) => out.push(AirNode::Continue(lower_continue_target(*target))),
        Stmt::FunctionDecl { name, params, variadic, body, location } => {
            out.push(AirNode::FunctionDefine {
                name: ByteString::from(name.as_str()),
                params: params.iter().map(|p| ByteString::from(p.as_str())).collect(),
                variadic: *variadic,
                body: lower_block(body),
                location: location.clone(),
            });
            out.push(AirNode::Declare { name: ByteString::from(name.as_str()), immutable: true, has_init: true });
        }
    }
}

/// Expands `var [a, b] = pair;` / `var {x, y} = point;` into repeated
/// `Subscript` reads off one evaluation of `init`: each name but the
/// last `Dup`s the running reference before peeling a field off, so the
/// initializer is evaluated exactly once regardless of pattern arity.
fn lower_destructure(pattern: &Pattern, immutable: bool, init: &Expr, out: &mut Vec<AirNode>) {
    lower_expr(init, out);
    let names: &[String] = match pattern {
        Pattern::Array(names) | Pattern::Object(names) => names,
    };
    let last = names.len().saturating_sub(1);
    for (i, name) in names.iter().enumerate() {
        if i != last {
            out.push(AirNode::Dup);
        }
        match pattern {
            Pattern::Array(_) => out.push(AirNode::PushConstant(Value::Integer(i as i64))),
            Pattern::Object(_) => out.push(AirNode::PushConstant(Value::String(ByteString::from(name.as_str())))),
        }
        out.push(AirNode::Subscript);
        out.push(AirNode::Declare { name: ByteString::from(name.as_str()), immutable, has_init: true });
    }
}

fn lower_switch_arm(arm: &ast::SwitchArm) -> SwitchClause {
    let locals: Vec<ByteString> = arm.locals.iter().map(|n| ByteString::from(n.as_str())).collect();
    let body = lower_block(&arm.body);
    match &arm.test {
        None => SwitchClause::Default { locals, body },
        Some(SwitchTest::Value(e)) => SwitchClause::Value { cond: lower_expr_queue(e), locals, body },
        Some(SwitchTest::Range(lo, hi, kind)) => {
            SwitchClause::Range { lo: lower_expr_queue(lo), hi: lower_expr_queue(hi), kind: lower_interval_kind(*kind), locals, body }
        }
    }
}

fn lower_interval_kind(kind: AstIntervalKind) -> IntervalKind {
    match kind {
        AstIntervalKind::Closed => IntervalKind::Closed,
        AstIntervalKind::HalfOpenRight => IntervalKind::HalfOpenRight,
        AstIntervalKind::HalfOpenLeft => IntervalKind::HalfOpenLeft,
        AstIntervalKind::Open => IntervalKind::Open,
    }
}

fn lower_break_target(target: ast::BreakTarget) -> BreakKind {
    match target {
        ast::BreakTarget::Unspec => BreakKind::Unspec,
        ast::BreakTarget::Switch => BreakKind::Switch,
        ast::BreakTarget::While => BreakKind::While,
        ast::BreakTarget::For => BreakKind::For,
    }
}

fn lower_continue_target(target: ast::ContinueTarget) -> ContinueKind {
    match target {
        ast::ContinueTarget::Unspec => ContinueKind::Unspec,
        ast::ContinueTarget::While => ContinueKind::While,
        ast::ContinueTarget::For => ContinueKind::For,
    }
}

fn lower_binary_op(op: BinaryOp) -> BinaryOperator {
    match op {
        BinaryOp::Add => BinaryOperator::Add,
        BinaryOp::Sub => BinaryOperator::Sub,
        BinaryOp::Mul => BinaryOperator::Mul,
        BinaryOp::Div => BinaryOperator::Div,
        BinaryOp::Rem => BinaryOperator::Rem,
        BinaryOp::Shl => BinaryOperator::Shl,
        BinaryOp::Shr => BinaryOperator::Shr,
        BinaryOp::Lt => BinaryOperator::Lt,
        BinaryOp::Le => BinaryOperator::Le,
        BinaryOp::Gt => BinaryOperator::Gt,
        BinaryOp::Ge => BinaryOperator::Ge,
        BinaryOp::Eq => BinaryOperator::Eq,
        BinaryOp::Ne => BinaryOperator::Ne,
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are lowered via AirNode::ShortCircuit"),
    }
}

/// Pushes exactly one [`Reference`](asteria_runtime::reference::Reference)
/// onto the evaluation stack. For lvalue expressions (`Ident`, `Index`,
/// `This`) that reference is the addressable slot itself, not a
/// snapshot of its current value — callers that need the value (most of
/// them) read through it; callers building an assignment target
/// (`Assign`, `CompoundAssign`, `Unset`) use it directly.
fn lower_expr(expr: &Expr, out: &mut Vec<AirNode>) {
    match expr {
        Expr::Literal(lit, _loc) => out.push(AirNode::PushConstant(lower_literal(lit))),
        Expr::Ident(name, loc) => out.push(AirNode::PushLocalRef(ByteString::from(name.as_str()), loc.clone())),
        Expr::This(_loc) => out.push(AirNode::PushThis),
        Expr::Array(items) => {
            for item in items {
                lower_expr(item, out);
            }
            out.push(AirNode::MakeArray(items.len()));
        }
        Expr::Object(fields) => {
            for (_, value) in fields {
                lower_expr(value, out);
            }
            let keys = fields.iter().map(|(k, _)| ByteString::from(k.as_str())).collect();
            out.push(AirNode::MakeObject(keys));
        }
        Expr::Unary(UnaryOp::Unset, operand, _loc) => {
            lower_expr(operand, out);
            out.push(AirNode::Unset);
        }
        Expr::Unary(op, operand, loc) => {
            lower_expr(operand, out);
            let air_op = match op {
                UnaryOp::Neg => UnaryOperator::Neg,
                UnaryOp::Not => UnaryOperator::Not,
                UnaryOp::BitNot => UnaryOperator::BitNot,
                UnaryOp::CountOf => UnaryOperator::CountOf,
                UnaryOp::TypeOf => UnaryOperator::TypeOf,
                UnaryOp::Unset => unreachable!("handled above"),
            };
            out.push(AirNode::Unary(air_op, loc.clone()));
        }
        Expr::Binary(BinaryOp::And, lhs, rhs, _loc) => {
            lower_expr(lhs, out);
            out.push(AirNode::ShortCircuit { is_and: true, rhs: lower_expr_queue(rhs) });
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs, _loc) => {
            lower_expr(lhs, out);
            out.push(AirNode::ShortCircuit { is_and: false, rhs: lower_expr_queue(rhs) });
        }
        Expr::Binary(op, lhs, rhs, loc) => {
            lower_expr(lhs, out);
            lower_expr(rhs, out);
            out.push(AirNode::Binary(lower_binary_op(*op), loc.clone()));
        }
        Expr::Assign(lhs, rhs) => {
            lower_expr(lhs, out);
            lower_expr(rhs, out);
            out.push(AirNode::Assign);
        }
        Expr::CompoundAssign(op, lhs, rhs, loc) => {
            lower_expr(lhs, out);
            lower_expr(rhs, out);
            out.push(AirNode::CompoundAssign(lower_binary_op(*op), loc.clone()));
        }
        Expr::Index(base, index) => {
            lower_expr(base, out);
            lower_expr(index, out);
            out.push(AirNode::Subscript);
        }
        Expr::Call { callee, args, location } => {
            lower_expr(callee, out);
            for arg in args {
                lower_expr(arg, out);
            }
            // Calls reached through ordinary `lower_expr` are never in
            // tail position; `lower_expr_in_tail_position` below is the
            // only place that emits `tail: true`.
            out.push(AirNode::Call { arg_count: args.len(), tail: false, location: location.clone() });
        }
        Expr::Function { name, params, variadic, body, location } => out.push(AirNode::FunctionDefine {
            name: ByteString::from(name.clone().unwrap_or_default().as_str()),
            params: params.iter().map(|p| ByteString::from(p.as_str())).collect(),
            variadic: *variadic,
            body: lower_block(body),
            location: location.clone(),
        }),
        Expr::Ternary(cond, then_expr, else_expr) => out.push(AirNode::Ternary {
            cond: lower_expr_queue(cond),
            then_value: lower_expr_queue(then_expr),
            else_value: lower_expr_queue(else_expr),
        }),
    }
}

/// Lowers `expr` knowing it sits in a proper-tail-call position (spec
/// §4.G): the sole expression of a `return`, the right operand of a
/// short-circuit operator whose whole expression is in tail position, or
/// the third operand of a ternary whose whole expression is in tail
/// position. A bare call there is annotated `tail: true`; a
/// short-circuit or ternary forwards tail position into the operand(s)
/// spec §4.G names and lowers the rest normally; anything else has no
/// tail call to mark and falls back to ordinary lowering.
fn lower_expr_in_tail_position(expr: &Expr, out: &mut Vec<AirNode>) {
    match expr {
        Expr::Call { callee, args, location } => {
            lower_expr(callee, out);
            for arg in args {
                lower_expr(arg, out);
            }
            out.push(AirNode::Call { arg_count: args.len(), tail: true, location: location.clone() });
        }
        Expr::Binary(BinaryOp::And, lhs, rhs, _loc) => {
            lower_expr(lhs, out);
            out.push(AirNode::ShortCircuit { is_and: true, rhs: lower_expr_queue_in_tail_position(rhs) });
        }
        Expr::Binary(BinaryOp::Or, lhs, rhs, _loc) => {
            lower_expr(lhs, out);
            out.push(AirNode::ShortCircuit { is_and: false, rhs: lower_expr_queue_in_tail_position(rhs) });
        }
        Expr::Ternary(cond, then_expr, else_expr) => out.push(AirNode::Ternary {
            cond: lower_expr_queue(cond),
            // Only the third operand (the else branch) is a PTC
            // position per spec §4.G; the second operand (then) is not.
            then_value: lower_expr_queue(then_expr),
            else_value: lower_expr_queue_in_tail_position(else_expr),
        }),
        other => lower_expr(other, out),
    }
}

fn lower_expr_queue_in_tail_position(expr: &Expr) -> AirQueue {
    let mut out = Vec::new();
    lower_expr_in_tail_position(expr, &mut out);
    AirQueue::from_nodes(out)
}

fn lower_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Real(r) => Value::Real(*r),
        Literal::String(s) => Value::String(ByteString::from(s.as_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use asteria_runtime::air::execute_top_level;
    use asteria_runtime::global_context::GlobalContext;

    fn run(src: &str) -> Value {
        let program = Parser::new(src, "<test>").unwrap().parse().unwrap();
        let queue = lower_program(&program);
        let mut global = GlobalContext::new();
        execute_top_level(&mut global, &queue).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(run("return 2 + 3 * 4;"), Value::Integer(14));
    }

    #[test]
    fn if_else_branches() {
        assert_eq!(run("if (1 == 2) { return 1; } else { return 2; }"), Value::Integer(2));
    }

    #[test]
    fn while_loop_accumulates() {
        assert_eq!(run("var i = 0; var sum = 0; while (i < 5) { sum += i; i += 1; } return sum;"), Value::Integer(10));
    }

    #[test]
    fn function_call_and_recursion() {
        let src = "func fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); } return fact(5);";
        assert_eq!(run(src), Value::Integer(120));
    }

    #[test]
    fn short_circuit_and_skips_side_effect() {
        let src = "var ran = false; func side() { ran = true; return true; } var x = false && side(); return ran;";
        assert_eq!(run(src), Value::Boolean(false));
    }

    #[test]
    fn short_circuit_or_skips_side_effect() {
        let src = "var ran = false; func side() { ran = true; return true; } var x = true || side(); return ran;";
        assert_eq!(run(src), Value::Boolean(false));
    }

    #[test]
    fn ternary_expression() {
        assert_eq!(run("return (1 < 2) ? \"yes\" : \"no\";"), Value::string_from_static("yes"));
    }

    #[test]
    fn array_and_index() {
        assert_eq!(run("var a = [1, 2, 3]; return a[1];"), Value::Integer(2));
    }

    #[test]
    fn object_field_access() {
        assert_eq!(run("var o = { x: 10 }; return o.x;"), Value::Integer(10));
    }

    #[test]
    fn for_loop_sum() {
        assert_eq!(run("var sum = 0; for (var i = 0; i < 4; i += 1) { sum += i; } return sum;"), Value::Integer(6));
    }

    #[test]
    fn switch_range_clause() {
        let src = "switch (7) { case 0 .. 10: return \"in\"; default: return \"out\"; }";
        assert_eq!(run(src), Value::string_from_static("in"));
    }

    #[test]
    fn array_destructure_binds_each_name() {
        assert_eq!(run("var [a, b] = [10, 20]; return a + b;"), Value::Integer(30));
    }

    #[test]
    fn object_destructure_binds_matching_fields() {
        assert_eq!(run("var {x, y} = { x: 1, y: 2 }; return x + y;"), Value::Integer(3));
    }

    #[test]
    fn switch_half_open_right_range_excludes_upper_bound() {
        let src = "switch (10) { case 0..10): return \"in\"; default: return \"out\"; }";
        assert_eq!(run(src), Value::string_from_static("out"));
    }

    #[test]
    fn tail_call_does_not_grow_stack_depth() {
        // No `tail` surface syntax: the lowering pass detects that this
        // call is the sole expression of its `return` and marks it tail
        // on its own (spec §4.G).
        let src = "func loop(n, acc) { if (n == 0) { return acc; } return loop(n - 1, acc + 1); } return loop(10000, 0);";
        assert_eq!(run(src), Value::Integer(10000));
    }

    #[test]
    fn tail_call_through_ternary_else_branch() {
        let src = "func f(n) { return n <= 0 ? 0 : f(n - 1); } return f(100000);";
        assert_eq!(run(src), Value::Integer(0));
    }
}
