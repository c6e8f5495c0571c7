use crate::func::{Arity, EvalContext, Logic, Tally, XorConflict};
use crate::value::Value;

/// Decision function for AND/OR-like gates.
///
/// `control` is the controlling value of the gate (`0` for AND, `1` for OR):
/// - any controlling input forces the output to `control`,
/// - otherwise any unknown input gives `U`,
/// - `D` and `D'` together cancel to `control`,
/// - a lone `D` or `D'` passes through,
/// - otherwise the output is the non-controlling value.
pub fn controlled(tally: Tally, control: Value) -> Value {
    debug_assert!(matches!(control, Value::Zero | Value::One), "Controlling value must be 0 or 1");
    if tally.count(control) > 0 {
        return control;
    }
    if tally.unknown > 0 {
        return Value::Unknown;
    }
    match (tally.d > 0, tally.dbar > 0) {
        (true, true)   => control,
        (true, false)  => Value::D,
        (false, true)  => Value::DBar,
        (false, false) => !control,
    }
}

/// Decision function for XOR-like gates.
///
/// `U` dominates. Otherwise the good and faulty machines are each the parity of their bits,
/// and `conflict` decides what happens when several inputs carry a fault effect.
pub fn parity(tally: Tally, conflict: XorConflict) -> Value {
    if tally.unknown > 0 {
        return Value::Unknown;
    }
    let good = (tally.one + tally.d) % 2 == 1;
    let faulty = (tally.one + tally.dbar) % 2 == 1;
    match conflict {
        XorConflict::Mask if tally.d + tally.dbar > 1 => Value::from(good),
        _ => Value::from_machines(good, faulty),
    }
}

macro_rules! controlled_gates {
    ($($(#[$m:meta])? $Id:ident: $name:literal, $control:expr, $invert:literal),*$(,)?) => {
        $(
            $(#[$m])?
            #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
            pub struct $Id;

            impl Logic for $Id {
                fn name(&self) -> &'static str {
                    $name
                }
                fn arity(&self) -> Arity {
                    Arity::Variadic
                }
                fn logic(&self, ctx: EvalContext<'_>) -> Value {
                    let value = controlled(Tally::of(ctx.inputs), $control);
                    if $invert { !value } else { value }
                }
            }
        )*
    }
}

macro_rules! parity_gates {
    ($($(#[$m:meta])? $Id:ident: $name:literal, $invert:literal),*$(,)?) => {
        $(
            $(#[$m])?
            #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
            pub struct $Id;

            impl Logic for $Id {
                fn name(&self) -> &'static str {
                    $name
                }
                fn arity(&self) -> Arity {
                    Arity::Variadic
                }
                fn logic(&self, ctx: EvalContext<'_>) -> Value {
                    let value = parity(Tally::of(ctx.inputs), ctx.xor_conflict);
                    if $invert { !value } else { value }
                }
            }
        )*
    }
}

controlled_gates! {
    /// An AND gate.
    And:  "AND",  Value::Zero, false,
    /// An OR gate.
    Or:   "OR",   Value::One,  false,
    /// A NAND gate.
    Nand: "NAND", Value::Zero, true,
    /// A NOR gate.
    Nor:  "NOR",  Value::One,  true,
}

parity_gates! {
    /// An XOR gate.
    Xor:  "XOR",  false,
    /// An XNOR gate.
    Xnor: "XNOR", true,
}

/// A NOT gate.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub struct Not;
impl Logic for Not {
    fn name(&self) -> &'static str {
        "NOT"
    }
    fn arity(&self) -> Arity {
        Arity::Unary
    }
    fn logic(&self, ctx: EvalContext<'_>) -> Value {
        !ctx.inputs[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value::{DBar, Unknown as U, One, Zero, D};

    fn run<L: Logic>(gate: L, inputs: &[Value]) -> Value {
        gate.logic(EvalContext::new(inputs))
    }
    fn run_exact<L: Logic>(gate: L, inputs: &[Value]) -> Value {
        gate.logic(EvalContext { xor_conflict: XorConflict::Exact, ..EvalContext::new(inputs) })
    }

    #[test]
    fn test_and_gate() {
        assert_eq!(run(And, &[D, One]), D, "Expected D & 1 = D");
        assert_eq!(run(And, &[D, DBar]), Zero, "Expected D & D' = 0");
        assert_eq!(run(And, &[D, Zero]), Zero, "Expected D & 0 = 0");
        assert_eq!(run(And, &[One, One]), One);
        assert_eq!(run(And, &[One, U]), U);
        assert_eq!(run(And, &[Zero, U]), Zero, "Controlling value should win over unknown");
        assert_eq!(run(And, &[DBar, One, One]), DBar);
        assert_eq!(run(And, &[D, DBar, U]), U, "Unknown is checked before the D/D' conflict");
    }

    #[test]
    fn test_or_gate() {
        assert_eq!(run(Or, &[Zero, Zero]), Zero);
        assert_eq!(run(Or, &[D, Zero]), D);
        assert_eq!(run(Or, &[D, DBar]), One, "Expected D | D' = 1");
        assert_eq!(run(Or, &[One, U]), One);
        assert_eq!(run(Or, &[Zero, U]), U);
    }

    #[test]
    fn test_nand_gate() {
        assert_eq!(run(Nand, &[One, One]), Zero);
        assert_eq!(run(Nand, &[D, One]), DBar);
        assert_eq!(run(Nand, &[D, DBar]), One);
    }

    #[test]
    fn test_nor_gate() {
        assert_eq!(run(Nor, &[Zero, Zero]), One, "Expected !(0 | 0) = 1");
        assert_eq!(run(Nor, &[One, Zero]), Zero, "Expected !(1 | 0) = 0");
        assert_eq!(run(Nor, &[DBar, Zero]), D);
    }

    #[test]
    fn test_xor_gate() {
        assert_eq!(run(Xor, &[One, Zero]), One);
        assert_eq!(run(Xor, &[One, One]), Zero);
        assert_eq!(run(Xor, &[D, Zero]), D);
        assert_eq!(run(Xor, &[D, One]), DBar);
        assert_eq!(run(Xor, &[DBar, One]), D);
        assert_eq!(run(Xor, &[D, U]), U);
        assert_eq!(run(Xor, &[One, Zero, One]), Zero);
    }

    #[test]
    fn test_xor_conflicts() {
        // masked: several deviating inputs degrade to the fault-free parity
        assert_eq!(run(Xor, &[D, DBar]), One);
        assert_eq!(run(Xor, &[D, D]), Zero);
        assert_eq!(run(Xor, &[D, D, D]), One);
        assert_eq!(run(Xor, &[D, DBar, One]), Zero);

        // exact: both machines computed independently
        assert_eq!(run_exact(Xor, &[D, DBar]), One);
        assert_eq!(run_exact(Xor, &[D, D]), Zero);
        assert_eq!(run_exact(Xor, &[D, D, D]), D);
        assert_eq!(run_exact(Xor, &[D, D, DBar]), DBar);
    }

    #[test]
    fn test_xnor_gate() {
        assert_eq!(run(Xnor, &[One, Zero]), Zero);
        assert_eq!(run(Xnor, &[Zero, Zero]), One);
        assert_eq!(run(Xnor, &[D, Zero]), DBar);
        assert_eq!(run(Xnor, &[D, D]), One);
    }

    #[test]
    fn test_not_gate() {
        assert_eq!(run(Not, &[Zero]), One);
        assert_eq!(run(Not, &[D]), DBar);
        assert_eq!(run(Not, &[U]), U);
    }

    #[test]
    fn test_inverting_pairs() {
        let cases: [&[Value]; 5] = [&[One, One], &[D, One], &[Zero, DBar], &[U, One], &[D, DBar]];
        for inputs in cases {
            assert_eq!(run(Nand, inputs), !run(And, inputs));
            assert_eq!(run(Nor, inputs), !run(Or, inputs));
            assert_eq!(run(Xnor, inputs), !run(Xor, inputs));
        }
    }
}
