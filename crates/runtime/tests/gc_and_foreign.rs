//! Crate-level GC scenarios that need a compiled script driving the
//! collector through `GlobalContext`, not just the unit-level `gc.rs`
//! tests that poke `VariableHandle`s directly.

use asteria_runtime::air::execute_top_level;
use asteria_runtime::bytestring::ByteString;
use asteria_runtime::global_context::GlobalContext;
use asteria_runtime::reference::Reference;
use asteria_runtime::value::Value;
use asteria_runtime::variable::Variable;

/// `asteria-compiler` depends on `asteria-runtime`, not the other way
/// around, so these tests build programs directly with `air::AirNode`
/// rather than compiling source text.
use asteria_runtime::air::{AirNode, AirQueue};

#[test]
fn a_local_array_out_of_scope_is_reclaimed_on_collect() {
    // `var a = []; a[0] = a;` by hand: declare `a`, then push the
    // subscript-reference `a[0]` followed by the rhs reference `a`, and
    // assign. Once the top-level block exits, nothing but the GC's own
    // tracked set still points at `a`'s Variable.
    let mut global = GlobalContext::new();
    let native = asteria_core::SourceLocation::native();
    let queue = AirQueue::from_nodes(vec![
        AirNode::MakeArray(0),
        AirNode::Declare { name: ByteString::from("a"), immutable: false, has_init: true },
        AirNode::PushLocalRef(ByteString::from("a"), native.clone()),
        AirNode::PushConstant(Value::Integer(0)),
        AirNode::Subscript,
        AirNode::PushLocalRef(ByteString::from("a"), native),
        AirNode::Assign,
        AirNode::Pop,
    ]);
    execute_top_level(&mut global, &queue).unwrap();

    let reclaimed = global.collect(2);
    assert_eq!(reclaimed, 1);
}

#[test]
fn a_foreign_variable_survives_collection() {
    let mut global = GlobalContext::new();
    let handle = Variable::foreign(Value::Integer(42)).handle();
    let reference = Reference::from_variable(handle);
    global.insert_named_reference(ByteString::from("shared"), reference.clone());

    global.collect(2);

    assert_eq!(reference.read().unwrap(), Value::Integer(42));
    assert_eq!(global.get_named_reference_opt(&ByteString::from("shared")).unwrap().read().unwrap(), Value::Integer(42));
}
