//! The gate list a circuit is compiled from.
//!
//! A [`Netlist`] is what a circuit description parser produces:
//! the primary inputs and outputs, and every gate with its kind and its fan-in names in order.

use serde::{Deserialize, Serialize};

/// A single gate declaration, e.g. `g = NAND(a, b)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecl {
    /// The name of the gate (and of the node it drives).
    pub name: String,
    /// The gate kind, e.g. `NAND` or `DFF`.
    pub kind: String,
    /// The names of the gate's inputs, in declaration order.
    pub inputs: Vec<String>,
}

/// A parsed but unlinked circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Netlist {
    /// Primary input names, in declaration order.
    pub inputs: Vec<String>,
    /// Primary output names, in declaration order.
    pub outputs: Vec<String>,
    /// Gate declarations, in declaration order.
    pub gates: Vec<GateDecl>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Default::default()
    }

    /// Declares a primary input.
    pub fn input(mut self, name: &str) -> Self {
        self.inputs.push(name.to_string());
        self
    }

    /// Declares a primary output.
    pub fn output(mut self, name: &str) -> Self {
        self.outputs.push(name.to_string());
        self
    }

    /// Declares a gate.
    pub fn gate(mut self, name: &str, kind: &str, inputs: &[&str]) -> Self {
        self.gates.push(GateDecl {
            name: name.to_string(),
            kind: kind.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        });
        self
    }
}
