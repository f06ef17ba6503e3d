//! Binary and unary operator dispatch tables.
//!
//! Both tables are keyed by (operator, operand kind), built on first use and
//! never mutated afterwards. Integer arithmetic wraps on overflow; floating
//! point follows IEEE 754 (division by zero yields inf or nan).

use crate::ast::{BinaryOp, UnaryOp};
use crate::types::Primitive;
use crate::values::Value;
use hashbrown::HashMap;
use lazy_static::lazy_static;

/// Failure of a single operator application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpError {
    DivisionByZero,
    // An operand was not of the kind the operator was selected for.
    Operand,
}

pub(crate) type BinaryFn = for<'t> fn(&Value<'t>, &Value<'t>) -> Result<Value<'t>, OpError>;
pub(crate) type UnaryFn = for<'t> fn(&Value<'t>) -> Result<Value<'t>, OpError>;

#[derive(Clone, Copy)]
pub(crate) struct BinaryOperator {
    pub result: Primitive,
    pub apply: BinaryFn,
}

macro_rules! binary_fn {
    ($name:ident, $kind:ident, |$a:ident, $b:ident| $body:expr) => {
        fn $name<'t>(left: &Value<'t>, right: &Value<'t>) -> Result<Value<'t>, OpError> {
            match (left, right) {
                (Value::$kind($a), Value::$kind($b)) => $body,
                _ => Err(OpError::Operand),
            }
        }
    };
}

macro_rules! unary_fn {
    ($name:ident, $kind:ident, |$a:ident| $body:expr) => {
        fn $name<'t>(operand: &Value<'t>) -> Result<Value<'t>, OpError> {
            match operand {
                Value::$kind($a) => $body,
                _ => Err(OpError::Operand),
            }
        }
    };
}

binary_fn!(int_add, Int, |a, b| Ok(Value::Int(a.wrapping_add(*b))));
binary_fn!(int_sub, Int, |a, b| Ok(Value::Int(a.wrapping_sub(*b))));
binary_fn!(int_mul, Int, |a, b| Ok(Value::Int(a.wrapping_mul(*b))));
binary_fn!(int_div, Int, |a, b| match b {
    0 => Err(OpError::DivisionByZero),
    _ => Ok(Value::Int(a.wrapping_div(*b))),
});
binary_fn!(int_rem, Int, |a, b| match b {
    0 => Err(OpError::DivisionByZero),
    _ => Ok(Value::Int(a.wrapping_rem(*b))),
});
binary_fn!(int_lt, Int, |a, b| Ok(Value::Bool(a < b)));
binary_fn!(int_le, Int, |a, b| Ok(Value::Bool(a <= b)));
binary_fn!(int_gt, Int, |a, b| Ok(Value::Bool(a > b)));
binary_fn!(int_ge, Int, |a, b| Ok(Value::Bool(a >= b)));

binary_fn!(double_add, Double, |a, b| Ok(Value::Double(a + b)));
binary_fn!(double_sub, Double, |a, b| Ok(Value::Double(a - b)));
binary_fn!(double_mul, Double, |a, b| Ok(Value::Double(a * b)));
binary_fn!(double_div, Double, |a, b| Ok(Value::Double(a / b)));
binary_fn!(double_lt, Double, |a, b| Ok(Value::Bool(a < b)));
binary_fn!(double_le, Double, |a, b| Ok(Value::Bool(a <= b)));
binary_fn!(double_gt, Double, |a, b| Ok(Value::Bool(a > b)));
binary_fn!(double_ge, Double, |a, b| Ok(Value::Bool(a >= b)));

binary_fn!(str_concat, Str, |a, b| {
    let mut joined = a.clone();
    joined.push_str(b);
    Ok(Value::Str(joined))
});
binary_fn!(str_lt, Str, |a, b| Ok(Value::Bool(a < b)));
binary_fn!(str_le, Str, |a, b| Ok(Value::Bool(a <= b)));
binary_fn!(str_gt, Str, |a, b| Ok(Value::Bool(a > b)));
binary_fn!(str_ge, Str, |a, b| Ok(Value::Bool(a >= b)));

binary_fn!(bool_and, Bool, |a, b| Ok(Value::Bool(*a && *b)));
binary_fn!(bool_or, Bool, |a, b| Ok(Value::Bool(*a || *b)));

unary_fn!(bool_not, Bool, |a| Ok(Value::Bool(!a)));
unary_fn!(int_neg, Int, |a| Ok(Value::Int(a.wrapping_neg())));
unary_fn!(int_plus, Int, |a| Ok(Value::Int(*a)));
unary_fn!(double_neg, Double, |a| Ok(Value::Double(-a)));
unary_fn!(double_plus, Double, |a| Ok(Value::Double(*a)));

lazy_static! {
    static ref BINARY_OPERATORS: HashMap<(BinaryOp, Primitive), BinaryOperator> = {
        use BinaryOp::*;
        use Primitive::{Bool, Double, Int, Str};

        let entries: [(BinaryOp, Primitive, Primitive, BinaryFn); 24] = [
            (Add, Int, Int, int_add),
            (Sub, Int, Int, int_sub),
            (Mul, Int, Int, int_mul),
            (Div, Int, Int, int_div),
            (Rem, Int, Int, int_rem),
            (Lt, Int, Bool, int_lt),
            (Le, Int, Bool, int_le),
            (Gt, Int, Bool, int_gt),
            (Ge, Int, Bool, int_ge),
            (Add, Double, Double, double_add),
            (Sub, Double, Double, double_sub),
            (Mul, Double, Double, double_mul),
            (Div, Double, Double, double_div),
            (Lt, Double, Bool, double_lt),
            (Le, Double, Bool, double_le),
            (Gt, Double, Bool, double_gt),
            (Ge, Double, Bool, double_ge),
            (Add, Str, Str, str_concat),
            (Lt, Str, Bool, str_lt),
            (Le, Str, Bool, str_le),
            (Gt, Str, Bool, str_gt),
            (Ge, Str, Bool, str_ge),
            (And, Bool, Bool, bool_and),
            (Or, Bool, Bool, bool_or),
        ];
        entries
            .into_iter()
            .map(|(op, operand, result, apply)| ((op, operand), BinaryOperator { result, apply }))
            .collect()
    };

    static ref UNARY_OPERATORS: HashMap<(UnaryOp, Primitive), UnaryFn> = {
        let entries: [(UnaryOp, Primitive, UnaryFn); 5] = [
            (UnaryOp::Not, Primitive::Bool, bool_not),
            (UnaryOp::Neg, Primitive::Int, int_neg),
            (UnaryOp::Plus, Primitive::Int, int_plus),
            (UnaryOp::Neg, Primitive::Double, double_neg),
            (UnaryOp::Plus, Primitive::Double, double_plus),
        ];
        entries
            .into_iter()
            .map(|(op, operand, apply)| ((op, operand), apply))
            .collect()
    };
}

/// Operators the compiler knows how to dispatch. Anything else is rejected
/// regardless of operand types.
pub(crate) fn is_supported(op: BinaryOp) -> bool {
    !matches!(
        op,
        BinaryOp::Xor | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::Shl | BinaryOp::Shr | BinaryOp::AndNot
    )
}

pub(crate) fn binary_operator(op: BinaryOp, operand: Primitive) -> Option<BinaryOperator> {
    BINARY_OPERATORS.get(&(op, operand)).copied()
}

pub(crate) fn unary_operator(op: UnaryOp, operand: Primitive) -> Option<UnaryFn> {
    UNARY_OPERATORS.get(&(op, operand)).copied()
}
