//! Gate functions for fault simulation.
//!
//! Every gate kind is a small unit struct implementing [`Logic`], a pure function
//! from the values on its input wires to the value on its output.
//! [`GateFn`] collects all of them behind `enum_dispatch`.
//!
//! ## This module notably consists of:
//! - **[`Logic`]**: The interface every gate implements.
//! - **[`Tally`]**: A count of each of the five values among a gate's inputs,
//!   which is all the combinational gates need to make their decision.
//! - **[`GateFn`]**: The enum of all supported gate kinds, parsed from names like `NAND` or `DFF`.
use std::str::FromStr;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use crate::value::Value;

pub use gates::*;
pub use memory::*;
pub use wiring::*;

mod gates;
mod memory;
mod wiring;

/// How to treat an XOR/XNOR gate where more than one input carries a fault effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XorConflict {
    /// Fault effects on several inputs mask each other.
    ///
    /// The output is the fault-free parity (`0` or `1`),
    /// so a fault only propagates through the gate when exactly one input deviates.
    #[default]
    Mask,
    /// Good and faulty machines are computed independently
    /// (e.g. `D ^ D' = 1`, `D ^ D = 0`, `D ^ D ^ D = D`).
    Exact,
}

/// The number of inputs a gate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    /// The gate is driven externally and has no inputs.
    Source,
    /// The gate has exactly one input.
    Unary,
    /// The gate has at least one input.
    Variadic,
}
impl Arity {
    /// Whether a gate with this arity can have `n` inputs.
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Source   => n == 0,
            Arity::Unary    => n == 1,
            Arity::Variadic => n >= 1,
        }
    }
}
impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Arity::Source   => "no inputs",
            Arity::Unary    => "exactly one input",
            Arity::Variadic => "at least one input",
        })
    }
}

/// A count of each value among a gate's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    /// Number of `0` inputs.
    pub zero: usize,
    /// Number of `1` inputs.
    pub one: usize,
    /// Number of `U` inputs.
    pub unknown: usize,
    /// Number of `D` inputs.
    pub d: usize,
    /// Number of `D'` inputs.
    pub dbar: usize,
}
impl Tally {
    /// Counts the values in `inputs`.
    pub fn of(inputs: &[Value]) -> Self {
        inputs.iter().fold(Tally::default(), |mut tally, &v| {
            match v {
                Value::Zero    => tally.zero += 1,
                Value::One     => tally.one += 1,
                Value::Unknown => tally.unknown += 1,
                Value::D       => tally.d += 1,
                Value::DBar    => tally.dbar += 1,
            }
            tally
        })
    }

    /// The number of inputs holding `value`.
    pub fn count(&self, value: Value) -> usize {
        match value {
            Value::Zero    => self.zero,
            Value::One     => self.one,
            Value::Unknown => self.unknown,
            Value::D       => self.d,
            Value::DBar    => self.dbar,
        }
    }
}

/// Everything a gate may look at when it is evaluated.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// The values on the gate's input wires, in fan-in order.
    pub inputs: &'a [Value],
    /// The value assigned to this node by the current test vector
    /// (only meaningful for sources).
    pub assigned: Value,
    /// XOR conflict policy.
    pub xor_conflict: XorConflict,
}
impl<'a> EvalContext<'a> {
    /// Creates a context for a gate with the given inputs and default settings.
    pub fn new(inputs: &'a [Value]) -> Self {
        Self { inputs, assigned: Value::Unknown, xor_conflict: XorConflict::default() }
    }
}

/// The interface defining how a gate computes its output.
#[enum_dispatch]
pub trait Logic {
    /// The gate's name as it appears in a netlist.
    fn name(&self) -> &'static str;

    /// The number of inputs this gate accepts.
    fn arity(&self) -> Arity;

    /// Whether the gate holds state across clock cycles.
    fn is_sequential(&self) -> bool {
        false
    }

    /// Computes the gate's output.
    ///
    /// For sequential gates, this is the *pending* value, which only becomes
    /// visible once the gate is captured.
    fn logic(&self, ctx: EvalContext<'_>) -> Value;
}

/// An enum that represents all supported gate kinds.
#[enum_dispatch(Logic)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[allow(missing_docs)]
pub enum GateFn {
    // Gates
    And, Or, Nand, Nor, Xor, Xnor, Not,
    // Wiring
    Input, Buff,
    // Memory
    Dff
}
impl GateFn {
    /// Whether this is a D flip-flop.
    pub fn is_flip_flop(&self) -> bool {
        matches!(self, GateFn::Dff(_))
    }
}

/// Error raised when a gate name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gate kind {0:?}")]
pub struct UnknownGateKind(pub String);

impl FromStr for GateFn {
    type Err = UnknownGateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let gate = match s.trim().to_ascii_uppercase().as_str() {
            "AND"  => And.into(),
            "OR"   => Or.into(),
            "NAND" => Nand.into(),
            "NOR"  => Nor.into(),
            "XOR"  => Xor.into(),
            "XNOR" => Xnor.into(),
            "NOT"  => Not.into(),
            "BUFF" | "BUFFER" => Buff.into(),
            "DFF"  => Dff.into(),
            "INPUT" => Input.into(),
            _ => return Err(UnknownGateKind(s.to_string())),
        };
        Ok(gate)
    }
}
impl std::fmt::Display for GateFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("NAND".parse::<GateFn>(), Ok(GateFn::Nand(Nand)));
        assert_eq!("buffer".parse::<GateFn>(), Ok(GateFn::Buff(Buff)));
        assert_eq!("BUFF".parse::<GateFn>(), Ok(GateFn::Buff(Buff)));
        assert!("MUX".parse::<GateFn>().is_err());
        for name in ["AND", "OR", "NAND", "NOR", "XOR", "XNOR", "NOT", "BUFF", "DFF", "INPUT"] {
            assert_eq!(name.parse::<GateFn>().map(|g| g.name()), Ok(name));
        }
    }

    #[test]
    fn tally_counts() {
        let tally = Tally::of(&[Value::D, Value::One, Value::D, Value::Unknown]);
        assert_eq!(tally, Tally { zero: 0, one: 1, unknown: 1, d: 2, dbar: 0 });
        assert_eq!(tally.count(Value::D), 2);
    }

    #[test]
    fn arity() {
        assert!(Arity::Unary.accepts(1));
        assert!(!Arity::Unary.accepts(2));
        assert!(!Arity::Variadic.accepts(0));
        assert!(Arity::Source.accepts(0));
        assert_eq!(GateFn::from(Dff).arity(), Arity::Unary);
        assert!(GateFn::from(Dff).is_sequential());
        assert!(!GateFn::from(And).is_sequential());
    }
}
