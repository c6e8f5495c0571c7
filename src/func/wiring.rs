use crate::func::{Arity, EvalContext, Logic};
use crate::value::Value;

/// A primary input.
///
/// It has no fan-in and outputs whatever the current test vector assigned to it.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Input;
impl Logic for Input {
    fn name(&self) -> &'static str {
        "INPUT"
    }
    fn arity(&self) -> Arity {
        Arity::Source
    }
    fn logic(&self, ctx: EvalContext<'_>) -> Value {
        ctx.assigned
    }
}

/// A buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Buff;
impl Logic for Buff {
    fn name(&self) -> &'static str {
        "BUFF"
    }
    fn arity(&self) -> Arity {
        Arity::Unary
    }
    fn logic(&self, ctx: EvalContext<'_>) -> Value {
        ctx.inputs[0]
    }
}
