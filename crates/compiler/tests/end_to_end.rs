//! End-to-end scripted scenarios: compile a whole source unit, execute
//! it against a fresh global context, check the result. One test per
//! concrete scenario.

use asteria_compiler::compile_source;
use asteria_runtime::air::execute_top_level;
use asteria_runtime::global_context::GlobalContext;
use asteria_runtime::value::Value;

fn run(source: &str) -> Value {
    let queue = compile_source(source, "<test>").unwrap();
    let mut global = GlobalContext::new();
    execute_top_level(&mut global, &queue).unwrap()
}

#[test]
fn assert_of_a_true_arithmetic_comparison_succeeds() {
    let result = run("assert 2 + 3 * 4 == 14; return true;");
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn tail_recursion_to_ten_thousand_returns_the_base_case() {
    // No `tail` annotation needed: the ternary's else branch is a PTC
    // position the compiler detects on its own (spec §4.G).
    let result = run("func f(n) { return n <= 0 ? 0 : f(n - 1); } return f(10000);");
    assert_eq!(result, Value::Integer(0));
}

#[test]
fn defer_runs_at_its_own_block_scope_exit_not_the_function_s() {
    // `defer g()` lives inside `{ ... }`, so `g()` must run before `h()`,
    // not after it (spec §4.E/§5: defer fires on exit of the lexical
    // scope that registered it).
    let result = run(
        "var log = [];
         func f() { log[countof(log)] = \"g\"; }
         func h() { log[countof(log)] = \"h\"; }
         { defer f(); }
         h();
         return log;",
    );
    match result {
        Value::Array(items) => {
            let names: Vec<_> = items.iter().map(|v| v.as_string().unwrap().to_string_lossy().into_owned()).collect();
            assert_eq!(names, vec!["g", "h"]);
        }
        other => panic!("expected an array, got {other:?}"),
    }
}

#[test]
fn try_catch_inspects_the_thrown_value_type() {
    let result = run(
        "try { throw \"meow\"; assert false; } catch (e) { assert typeof(e) == \"string\"; } return true;",
    );
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn for_each_over_an_array_yields_index_value_pairs_in_order() {
    let result = run(
        "var ok = true;
         var idx = 0;
         for each (k, v : [10, 11, 12]) {
             if (k != idx) { ok = false; }
             if (v != 10 + idx) { ok = false; }
             idx = idx + 1;
         }
         if (idx != 3) { ok = false; }
         return ok;",
    );
    assert_eq!(result, Value::Boolean(true));
}

#[test]
fn for_each_over_an_object_preserves_insertion_order() {
    let result = run(
        "var keys = [];
         var i = 0;
         for each (k, v : {a: 1, b: 2, c: 3}) {
             keys[i] = k;
             i = i + 1;
         }
         return keys;",
    );
    match result {
        Value::Array(items) => {
            let names: Vec<_> = items.iter().map(|v| v.as_string().unwrap().to_string_lossy().into_owned()).collect();
            assert_eq!(names, vec!["a", "b", "c"]);
        }
        other => panic!("expected an array, got {other:?}"),
    }
}

#[test]
fn switch_half_open_range_excludes_the_upper_bound() {
    let result = run(
        "func bucket(n) {
             switch (n) {
                 case 0..10): return \"low\";
                 case 10..20: return \"mid\";
                 default: return \"high\";
             }
         }
         return bucket(9) + \",\" + bucket(10) + \",\" + bucket(20) + \",\" + bucket(21);",
    );
    assert_eq!(result.as_string().unwrap().to_string_lossy(), "low,mid,mid,high");
}

#[test]
fn array_and_object_destructuring_bind_each_name() {
    let result = run(
        "var [a, b] = [1, 2];
         var {x, y} = {x: 10, y: 20};
         return a + b + x + y;",
    );
    assert_eq!(result, Value::Integer(33));
}

#[test]
fn logical_operators_short_circuit_and_ternary_selects_a_branch() {
    let result = run(
        "var calls = 0;
         func bump() { calls = calls + 1; return true; }
         var a = false && bump();
         var b = true || bump();
         var c = calls == 0 ? \"none called\" : \"something called\";
         return c;",
    );
    assert_eq!(result.as_string().unwrap().to_string_lossy(), "none called");
}
