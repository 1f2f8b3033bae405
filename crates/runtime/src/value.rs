//! `Value` (spec §3/§4.A): the universal tagged sum type every reference
//! ultimately resolves to.

use crate::bytestring::ByteString;
use crate::function::Function;
use crate::object::Object;
use crate::variable::VariableSet;
use asteria_core::{ErrorKind, Fault};
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

/// Three-way (plus "unordered") comparison result, per spec §4.A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compare {
    Unordered,
    Less,
    Equal,
    Greater,
}

/// A host-provided object handle (spec §3 `opaque`). Stateful
/// standard-library primitives (file handles, RNG state, regex compiled
/// forms, ...) are expressed this way rather than as new `Value`
/// variants, keeping the core's variant set closed.
pub trait OpaqueObject: fmt::Debug {
    /// Human-readable description, used by `print`.
    fn describe(&self) -> String;

    /// Enumerate variables reachable in one hop through this object, for
    /// GC tracing (spec §4.A `enumerate_variables`). Most opaque objects
    /// hold no variables and can use the default empty implementation.
    fn enumerate_variables(&self, _staged: &mut VariableSet, _temp: &mut VariableSet) {}
}

/// `Value`: the tagged union described in spec §3.
///
/// Variant order below is the type-ordering used by cross-type
/// `compare()` (`null < boolean < integer ≈ real < string < other`);
/// `Opaque`/`Function`/`Array`/`Object` are all "other" and compare only
/// for equality across variants.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(ByteString),
    Opaque(Rc<dyn OpaqueObject>),
    Function(Rc<Function>),
    Array(Rc<Vec<Value>>),
    Object(Rc<Object>),
}

/// Relative rank used for cross-type ordering; integer and real share a
/// rank because they compare numerically against each other.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Real(_) => 2,
        Value::String(_) => 3,
        Value::Opaque(_) => 4,
        Value::Function(_) => 4,
        Value::Array(_) => 4,
        Value::Object(_) => 4,
    }
}

impl Value {
    pub fn string_from_static(s: &str) -> Value {
        Value::String(ByteString::from(s))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Opaque(_) => "opaque",
            Value::Function(_) => "function",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Result<i64, Fault> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(type_mismatch("integer", other)),
        }
    }

    pub fn as_real(&self) -> Result<f64, Fault> {
        match self {
            Value::Integer(i) => Ok(*i as f64),
            Value::Real(r) => Ok(*r),
            other => Err(type_mismatch("real", other)),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, Fault> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(type_mismatch("boolean", other)),
        }
    }

    pub fn as_string(&self) -> Result<&ByteString, Fault> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(type_mismatch("string", other)),
        }
    }

    pub fn as_array(&self) -> Result<&Rc<Vec<Value>>, Fault> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(type_mismatch("array", other)),
        }
    }

    pub fn as_object(&self) -> Result<&Rc<Object>, Fault> {
        match self {
            Value::Object(o) => Ok(o),
            other => Err(type_mismatch("object", other)),
        }
    }

    pub fn as_function(&self) -> Result<&Rc<Function>, Fault> {
        match self {
            Value::Function(f) => Ok(f),
            other => Err(type_mismatch("function", other)),
        }
    }

    /// `test()` per spec §4.A: null/false/0/0.0/""/[]/{} are falsy; every
    /// other value, including NaN, is truthy.
    pub fn test(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Real(r) => *r != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Opaque(_) | Value::Function(_) => true,
        }
    }

    /// `compare()` per spec §4.A and §9 Open Question (ii): NaN is
    /// unordered with everything, including itself; `0.0 == -0.0` per
    /// IEEE equality, matching the original.
    pub fn compare(&self, other: &Value) -> Compare {
        let (ra, rb) = (type_rank(self), type_rank(other));
        // Cross-tier ordering per spec §3/§4.A:
        // `null < boolean < integer ≈ real < string < other`. Only within
        // the top "other" tier (opaque/function/array/object) does a type
        // mismatch fall back to equality-only comparison.
        if ra != rb {
            return if ra == 4 && rb == 4 {
                Compare::Unordered
            } else if ra < rb {
                Compare::Less
            } else {
                Compare::Greater
            };
        }
        match (self, other) {
            (Value::Null, Value::Null) => Compare::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => cmp_ord(a, b),
            (Value::Integer(a), Value::Integer(b)) => cmp_ord(a, b),
            (Value::Integer(a), Value::Real(b)) => cmp_f64(*a as f64, *b),
            (Value::Real(a), Value::Integer(b)) => cmp_f64(*a, *b as f64),
            (Value::Real(a), Value::Real(b)) => cmp_f64(*a, *b),
            (Value::String(a), Value::String(b)) => cmp_ord(a.as_bytes(), b.as_bytes()),
            (Value::Array(a), Value::Array(b)) => {
                if Rc::ptr_eq(a, b) {
                    Compare::Equal
                } else if a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.compare(y) == Compare::Equal) {
                    Compare::Equal
                } else {
                    Compare::Unordered
                }
            }
            (Value::Object(a), Value::Object(b)) => {
                if Rc::ptr_eq(a, b) {
                    Compare::Equal
                } else if structurally_equal_objects(a, b) {
                    Compare::Equal
                } else {
                    Compare::Unordered
                }
            }
            (Value::Function(a), Value::Function(b)) => {
                if Rc::ptr_eq(a, b) { Compare::Equal } else { Compare::Unordered }
            }
            (Value::Opaque(a), Value::Opaque(b)) => {
                if Rc::ptr_eq(a, b) { Compare::Equal } else { Compare::Unordered }
            }
            _ => Compare::Unordered,
        }
    }

    pub fn print(&self, out: &mut dyn fmt::Write, pretty: bool) -> fmt::Result {
        self.print_indented(out, pretty, 0)
    }

    fn print_indented(&self, out: &mut dyn fmt::Write, pretty: bool, indent: usize) -> fmt::Result {
        match self {
            Value::Null => write!(out, "null"),
            Value::Boolean(b) => write!(out, "{b}"),
            Value::Integer(i) => write!(out, "{i}"),
            Value::Real(r) => print_real(out, *r),
            Value::String(s) => print_quoted_string(out, s.as_bytes()),
            Value::Opaque(o) => write!(out, "<opaque: {}>", o.describe()),
            Value::Function(f) => write!(out, "<function: {}>", f.signature()),
            Value::Array(items) => {
                out.write_char('[')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write_char(',')?;
                    }
                    if pretty {
                        write!(out, "\n{}", "  ".repeat(indent + 1))?;
                    }
                    item.print_indented(out, pretty, indent + 1)?;
                }
                if pretty && !items.is_empty() {
                    write!(out, "\n{}", "  ".repeat(indent))?;
                }
                out.write_char(']')
            }
            Value::Object(obj) => {
                out.write_char('{')?;
                for (i, (key, value)) in obj.iter().enumerate() {
                    if i > 0 {
                        out.write_char(',')?;
                    }
                    if pretty {
                        write!(out, "\n{}", "  ".repeat(indent + 1))?;
                    }
                    print_quoted_string(out, key.as_bytes())?;
                    out.write_str(": ")?;
                    value.print_indented(out, pretty, indent + 1)?;
                }
                if pretty && !obj.is_empty() {
                    write!(out, "\n{}", "  ".repeat(indent))?;
                }
                out.write_char('}')
            }
        }
    }

    /// GC tracing hop (spec §4.A): add directly reachable variables to
    /// `staged` and recurse. Only `Function` (captured upvalues) and
    /// `Opaque` (host state) can reach a `Variable`; `Array`/`Object` are
    /// walked purely to find those two buried inside.
    pub fn enumerate_variables(&self, staged: &mut VariableSet, temp: &mut VariableSet) {
        match self {
            Value::Null
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Real(_)
            | Value::String(_) => {}
            Value::Opaque(o) => o.enumerate_variables(staged, temp),
            Value::Function(f) => f.enumerate_variables(staged, temp),
            Value::Array(items) => {
                for item in items.iter() {
                    item.enumerate_variables(staged, temp);
                }
            }
            Value::Object(obj) => {
                for (_, value) in obj.iter() {
                    value.enumerate_variables(staged, temp);
                }
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Compare::Equal
    }
}

fn structurally_equal_objects(a: &Object, b: &Object) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .all(|(k, v)| b.get(k).is_some_and(|bv| v.compare(bv) == Compare::Equal))
}

fn cmp_ord<T: Ord>(a: T, b: T) -> Compare {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => Compare::Less,
        std::cmp::Ordering::Equal => Compare::Equal,
        std::cmp::Ordering::Greater => Compare::Greater,
    }
}

fn cmp_f64(a: f64, b: f64) -> Compare {
    match a.partial_cmp(&b) {
        Some(std::cmp::Ordering::Less) => Compare::Less,
        Some(std::cmp::Ordering::Equal) => Compare::Equal,
        Some(std::cmp::Ordering::Greater) => Compare::Greater,
        None => Compare::Unordered,
    }
}

fn print_real(out: &mut dyn fmt::Write, r: f64) -> fmt::Result {
    if r.is_nan() {
        out.write_str("nan")
    } else if r.is_infinite() {
        out.write_str(if r > 0.0 { "infinity" } else { "-infinity" })
    } else {
        write!(out, "{r:?}")
    }
}

fn print_quoted_string(out: &mut dyn fmt::Write, bytes: &[u8]) -> fmt::Result {
    out.write_char('"')?;
    for &b in bytes {
        match b {
            b'"' => out.write_str("\\\"")?,
            b'\\' => out.write_str("\\\\")?,
            b'\n' => out.write_str("\\n")?,
            b'\t' => out.write_str("\\t")?,
            0x20..=0x7e => out.write_char(b as char)?,
            _ => write!(out, "\\x{b:02X}")?,
        }
    }
    out.write_char('"')
}

fn type_mismatch(expected: &str, got: &Value) -> Fault {
    Fault::new(
        ErrorKind::TypeMismatch,
        format!("expected a value of type `{expected}`, got `{}`", got.type_name()),
    )
}

// --- Arithmetic (spec §4.A numeric promotions) ---------------------------

fn both_numeric(a: &Value, b: &Value) -> bool {
    matches!(a, Value::Integer(_) | Value::Real(_)) && matches!(b, Value::Integer(_) | Value::Real(_))
}

macro_rules! checked_int_op {
    ($name:ident, $method:ident, $opname:literal) => {
        pub fn $name(a: i64, b: i64) -> Result<Value, Fault> {
            a.$method(b)
                .map(Value::Integer)
                .ok_or_else(|| Fault::new(ErrorKind::Overflow, format!("integer {} overflow", $opname)))
        }
    };
}

checked_int_op!(checked_iadd, checked_add, "addition");
checked_int_op!(checked_isub, checked_sub, "subtraction");
checked_int_op!(checked_imul, checked_mul, "multiplication");

pub fn value_add(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => checked_iadd(*x, *y),
        _ if both_numeric(a, b) => Ok(Value::Real(a.as_real()? + b.as_real()?)),
        (Value::String(x), Value::String(y)) => Ok(Value::String(x.concat(y)?)),
        (Value::Array(x), Value::Array(y)) => {
            let mut v = Vec::with_capacity(x.len() + y.len());
            v.extend(x.iter().cloned());
            v.extend(y.iter().cloned());
            Ok(Value::Array(Rc::new(v)))
        }
        _ => Err(type_mismatch_binary("+", a, b)),
    }
}

pub fn value_sub(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => checked_isub(*x, *y),
        _ if both_numeric(a, b) => Ok(Value::Real(a.as_real()? - b.as_real()?)),
        _ => Err(type_mismatch_binary("-", a, b)),
    }
}

pub fn value_mul(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => checked_imul(*x, *y),
        _ if both_numeric(a, b) => Ok(Value::Real(a.as_real()? * b.as_real()?)),
        (Value::String(s), Value::Integer(n)) | (Value::Integer(n), Value::String(s)) => {
            Ok(Value::String(s.duplicate(*n)?))
        }
        _ => Err(type_mismatch_binary("*", a, b)),
    }
}

pub fn value_div(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Err(Fault::new(ErrorKind::DivisionByZero, "integer division by zero"));
            }
            if *x == i64::MIN && *y == -1 {
                return Err(Fault::new(ErrorKind::Overflow, "integer division overflow (MIN / -1)"));
            }
            Ok(Value::Integer(x / y))
        }
        _ if both_numeric(a, b) => Ok(Value::Real(a.as_real()? / b.as_real()?)),
        _ => Err(type_mismatch_binary("/", a, b)),
    }
}

pub fn value_rem(a: &Value, b: &Value) -> Result<Value, Fault> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            if *y == 0 {
                return Err(Fault::new(ErrorKind::DivisionByZero, "integer modulo by zero"));
            }
            if *x == i64::MIN && *y == -1 {
                return Err(Fault::new(ErrorKind::Overflow, "integer modulo overflow (MIN / -1)"));
            }
            Ok(Value::Integer(x % y))
        }
        _ if both_numeric(a, b) => Ok(Value::Real(a.as_real()? % b.as_real()?)),
        _ => Err(type_mismatch_binary("%", a, b)),
    }
}

pub fn value_neg(a: &Value) -> Result<Value, Fault> {
    match a {
        Value::Integer(x) => x
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Fault::new(ErrorKind::Overflow, "integer negation overflow (MIN)")),
        Value::Real(x) => Ok(Value::Real(-x)),
        _ => Err(type_mismatch("integer or real", a)),
    }
}

/// Arithmetic left shift, rejecting negative counts and sign-bit overflow
/// per spec §4.A.
pub fn value_shl(a: &Value, b: &Value) -> Result<Value, Fault> {
    let x = a.as_integer()?;
    let n = b.as_integer()?;
    if n < 0 {
        return Err(Fault::new(ErrorKind::TypeMismatch, "shift count must not be negative"));
    }
    if n >= 64 {
        return if x == 0 { Ok(Value::Integer(0)) } else {
            Err(Fault::new(ErrorKind::Overflow, "left shift overflows the sign bit"))
        };
    }
    let shifted = x << n;
    if (shifted >> n) != x {
        return Err(Fault::new(ErrorKind::Overflow, "left shift overflows the sign bit"));
    }
    Ok(Value::Integer(shifted))
}

pub fn value_shr(a: &Value, b: &Value) -> Result<Value, Fault> {
    let x = a.as_integer()?;
    let n = b.as_integer()?;
    if n < 0 {
        return Err(Fault::new(ErrorKind::TypeMismatch, "shift count must not be negative"));
    }
    if n >= 64 {
        return Ok(Value::Integer(if x < 0 { -1 } else { 0 }));
    }
    Ok(Value::Integer(x >> n))
}

fn type_mismatch_binary(op: &str, a: &Value, b: &Value) -> Fault {
    let mut msg = String::new();
    let _ = write!(
        msg,
        "operator `{op}` is not defined for `{}` and `{}`",
        a.type_name(),
        b.type_name()
    );
    Fault::new(ErrorKind::TypeMismatch, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falsy_values() {
        assert!(!Value::Null.test());
        assert!(!Value::Boolean(false).test());
        assert!(!Value::Integer(0).test());
        assert!(!Value::Real(0.0).test());
        assert!(!Value::string_from_static("").test());
        assert!(!Value::Array(Rc::new(vec![])).test());
        assert!(!Value::Object(Rc::new(Object::new())).test());
    }

    #[test]
    fn nan_is_unordered_with_itself() {
        let nan = Value::Real(f64::NAN);
        assert_eq!(nan.compare(&nan), Compare::Unordered);
        assert!(nan.test(), "NaN is truthy");
    }

    #[test]
    fn negative_zero_equals_positive_zero() {
        assert_eq!(Value::Real(0.0).compare(&Value::Real(-0.0)), Compare::Equal);
    }

    #[test]
    fn cross_type_ordering() {
        // null < boolean < integer ≈ real < string < other (spec §4.A).
        assert_eq!(Value::Null.compare(&Value::Boolean(false)), Compare::Less);
        assert_eq!(Value::Boolean(true).compare(&Value::Integer(0)), Compare::Less);
        assert_eq!(Value::Integer(1).compare(&Value::Real(1.0)), Compare::Equal);
        assert_eq!(Value::Real(0.0).compare(&Value::string_from_static("")), Compare::Less);
        assert_eq!(
            Value::string_from_static("z").compare(&Value::Array(Rc::new(vec![]))),
            Compare::Less
        );
    }

    #[test]
    fn other_tier_cross_variant_is_unordered() {
        let arr = Value::Array(Rc::new(vec![]));
        let obj = Value::Object(Rc::new(Object::new()));
        assert_eq!(arr.compare(&obj), Compare::Unordered);
    }

    #[test]
    fn integer_overflow_faults() {
        assert!(value_add(&Value::Integer(i64::MAX), &Value::Integer(1)).is_err());
    }

    #[test]
    fn division_by_zero_faults() {
        assert!(value_div(&Value::Integer(1), &Value::Integer(0)).is_err());
    }

    #[test]
    fn min_div_neg_one_overflows() {
        assert!(value_div(&Value::Integer(i64::MIN), &Value::Integer(-1)).is_err());
    }

    #[test]
    fn int_plus_real_promotes() {
        let v = value_add(&Value::Integer(2), &Value::Real(0.5)).unwrap();
        assert_eq!(v, Value::Real(2.5));
    }

    #[test]
    fn string_duplication_by_integer() {
        let v = value_mul(&Value::string_from_static("ab"), &Value::Integer(3)).unwrap();
        assert_eq!(v, Value::string_from_static("ababab"));
    }
}
