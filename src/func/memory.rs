use crate::func::{Arity, EvalContext, Logic};
use crate::value::Value;

/// A D flip-flop.
///
/// Its logic only computes the pending value (the value on its D input).
/// The flip-flop's visible output changes when the circuit captures,
/// which is what decouples combinational propagation from state updates.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Dff;
impl Logic for Dff {
    fn name(&self) -> &'static str {
        "DFF"
    }
    fn arity(&self) -> Arity {
        Arity::Unary
    }
    fn is_sequential(&self) -> bool {
        true
    }
    fn logic(&self, ctx: EvalContext<'_>) -> Value {
        ctx.inputs[0]
    }
}
