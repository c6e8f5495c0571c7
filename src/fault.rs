//! Single stuck-at faults.
//!
//! A [`Fault`] pins either a node's output or one of its input wires to a constant.
//! Faults only refer to nodes by key, so they are cheap to copy, hash and order;
//! their text form (`c-0`, `c-a-1`) needs the [`CircuitGraph`] to resolve names.

use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitGraph, NodeKey};
use crate::value::Value;

/// The constant a faulty wire is stuck at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StuckAt {
    /// Stuck-at-0.
    #[serde(rename = "0")]
    Zero,
    /// Stuck-at-1.
    #[serde(rename = "1")]
    One,
}
impl StuckAt {
    /// Both polarities, stuck-at-0 first.
    pub const BOTH: [StuckAt; 2] = [StuckAt::Zero, StuckAt::One];

    /// The bit the faulty machine is forced to.
    pub const fn bit(self) -> bool {
        matches!(self, StuckAt::One)
    }

    /// The polarity as a plain [`Value`].
    pub const fn value(self) -> Value {
        match self {
            StuckAt::Zero => Value::Zero,
            StuckAt::One  => Value::One,
        }
    }
}
impl TryFrom<Value> for StuckAt {
    type Error = FaultError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Zero => Ok(StuckAt::Zero),
            Value::One  => Ok(StuckAt::One),
            v => Err(FaultError::InvalidPolarity(v)),
        }
    }
}
impl fmt::Display for StuckAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.bit() { "1" } else { "0" })
    }
}

/// Errors which can occur when building or parsing a [`Fault`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FaultError {
    /// The faulty input is not one of the target node's fan-ins.
    #[error("{input:?} is not an input of {node:?}")]
    NotAFanIn {
        /// Target node.
        node: String,
        /// Claimed input node.
        input: String,
    },
    /// A fault can only be stuck at `0` or `1`.
    #[error("a fault cannot be stuck at {0}")]
    InvalidPolarity(Value),
    /// A node name in a fault does not exist.
    #[error("no node named {0:?}")]
    UnknownNode(String),
    /// The text is not of the form `node-x` or `node-input-x`.
    #[error("malformed fault {0:?}")]
    Malformed(String),
}

/// A single stuck-at fault.
///
/// With `input == None`, the node's output is stuck.
/// Otherwise only the wire from `input` into `node` is stuck,
/// and the rest of `input`'s fan-out sees the fault-free value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fault {
    /// The node the fault is on.
    pub node: NodeKey,
    /// The driver of the faulty input wire, if this is a wire fault.
    pub input: Option<NodeKey>,
    /// The stuck polarity.
    pub stuck_at: StuckAt,
}
impl Fault {
    /// A fault on a node's output.
    pub fn on_node(node: NodeKey, stuck_at: StuckAt) -> Self {
        Self { node, input: None, stuck_at }
    }

    /// A fault on the wire from `input` into `node`.
    ///
    /// Fails if `input` does not drive `node`.
    pub fn on_wire(graph: &CircuitGraph, node: NodeKey, input: NodeKey, stuck_at: StuckAt) -> Result<Self, FaultError> {
        if !graph[node].inputs().contains(&input) {
            return Err(FaultError::NotAFanIn {
                node: graph[node].name().to_string(),
                input: graph[input].name().to_string(),
            });
        }
        Ok(Self { node, input: Some(input), stuck_at })
    }

    /// Creates a fault from a polarity given as a [`Value`].
    ///
    /// Fails if the polarity is not `0` or `1`, or if `input` does not drive `node`.
    pub fn new(graph: &CircuitGraph, node: NodeKey, input: Option<NodeKey>, stuck_at: Value) -> Result<Self, FaultError> {
        let stuck_at = StuckAt::try_from(stuck_at)?;
        match input {
            Some(input) => Self::on_wire(graph, node, input, stuck_at),
            None => Ok(Self::on_node(node, stuck_at)),
        }
    }

    /// Parses a fault in its text form (`node-x` or `node-input-x`).
    ///
    /// If a node's name itself contains `-`, the longest matching node name wins.
    pub fn parse(graph: &CircuitGraph, text: &str) -> Result<Self, FaultError> {
        let malformed = || FaultError::Malformed(text.to_string());
        let (head, polarity) = text.rsplit_once('-').ok_or_else(malformed)?;
        let stuck_at = match polarity {
            "0" => StuckAt::Zero,
            "1" => StuckAt::One,
            _ => return Err(malformed()),
        };

        if let Some(node) = graph.node(head) {
            return Ok(Self::on_node(node, stuck_at));
        }
        let (node, input) = head.rsplit_once('-').ok_or_else(|| FaultError::UnknownNode(head.to_string()))?;
        let node = graph.node(node).ok_or_else(|| FaultError::UnknownNode(node.to_string()))?;
        let input = graph.node(input).ok_or_else(|| FaultError::UnknownNode(input.to_string()))?;
        Self::on_wire(graph, node, input, stuck_at)
    }

    /// Returns an object that displays the fault with node names from `graph`.
    pub fn display<'a>(&self, graph: &'a CircuitGraph) -> FaultDisplay<'a> {
        FaultDisplay { fault: *self, graph }
    }
}

/// Helper for printing a [`Fault`] with its node names.
///
/// Created by [`Fault::display`].
#[derive(Debug, Clone, Copy)]
pub struct FaultDisplay<'a> {
    fault: Fault,
    graph: &'a CircuitGraph,
}
impl fmt::Display for FaultDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Fault { node, input, stuck_at } = self.fault;
        write!(f, "{}-", self.graph[node].name())?;
        if let Some(input) = input {
            write!(f, "{}-", self.graph[input].name())?;
        }
        write!(f, "{stuck_at}")
    }
}

/// Enumerates every single stuck-at fault of a circuit.
///
/// For each node in declaration order: the two output faults,
/// then the two faults of each distinct fan-in wire.
/// The result has `2N + 2E` faults, where `E` counts distinct driver/consumer pairs.
pub fn fault_universe(graph: &CircuitGraph) -> IndexSet<Fault> {
    let mut faults = IndexSet::new();
    for (key, node) in graph.nodes() {
        faults.extend(StuckAt::BOTH.map(|s| Fault::on_node(key, s)));
        for &input in node.inputs() {
            faults.extend(StuckAt::BOTH.map(|stuck_at| Fault { node: key, input: Some(input), stuck_at }));
        }
    }
    faults
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Netlist;

    fn and2() -> CircuitGraph {
        let netlist = Netlist::new()
            .input("a")
            .input("b")
            .output("c")
            .gate("c", "AND", &["a", "b"]);
        CircuitGraph::compile(&netlist).unwrap()
    }

    #[test]
    fn polarity() {
        assert_eq!(StuckAt::try_from(Value::One), Ok(StuckAt::One));
        assert_eq!(StuckAt::try_from(Value::D), Err(FaultError::InvalidPolarity(Value::D)));
        assert!(!StuckAt::Zero.bit());
        assert_eq!(StuckAt::One.value(), Value::One);
    }

    #[test]
    fn construction() {
        let graph = and2();
        let [a, b, c] = ["a", "b", "c"].map(|n| graph.node(n).unwrap());

        assert!(Fault::new(&graph, c, Some(a), Value::Zero).is_ok());
        assert_eq!(
            Fault::new(&graph, c, Some(c), Value::Zero),
            Err(FaultError::NotAFanIn { node: "c".into(), input: "c".into() })
        );
        assert_eq!(
            Fault::new(&graph, c, None, Value::Unknown),
            Err(FaultError::InvalidPolarity(Value::Unknown))
        );
        assert!(Fault::on_wire(&graph, a, b, StuckAt::One).is_err(), "inputs have no fan-in");
    }

    #[test]
    fn text_form() {
        let graph = and2();
        let c = graph.node("c").unwrap();
        let a = graph.node("a").unwrap();

        let fault = Fault::parse(&graph, "c-0").unwrap();
        assert_eq!(fault, Fault::on_node(c, StuckAt::Zero));
        assert_eq!(fault.display(&graph).to_string(), "c-0");

        let fault = Fault::parse(&graph, "c-a-1").unwrap();
        assert_eq!(fault, Fault { node: c, input: Some(a), stuck_at: StuckAt::One });
        assert_eq!(fault.display(&graph).to_string(), "c-a-1");

        assert_eq!(Fault::parse(&graph, "c"), Err(FaultError::Malformed("c".into())));
        assert_eq!(Fault::parse(&graph, "c-2"), Err(FaultError::Malformed("c-2".into())));
        assert_eq!(Fault::parse(&graph, "z-0"), Err(FaultError::UnknownNode("z".into())));
        assert!(matches!(Fault::parse(&graph, "a-b-0"), Err(FaultError::NotAFanIn { .. })));
    }

    #[test]
    fn universe() {
        let graph = and2();
        let faults = fault_universe(&graph);
        assert_eq!(faults.len(), 2 * 3 + 2 * 2);

        let names: Vec<_> = faults.iter().map(|f| f.display(&graph).to_string()).collect();
        assert_eq!(names, ["a-0", "a-1", "b-0", "b-1", "c-0", "c-1", "c-a-0", "c-a-1", "c-b-0", "c-b-1"]);
    }

    #[test]
    fn universe_collapses_repeated_fan_in() {
        let netlist = Netlist::new()
            .input("a")
            .output("c")
            .gate("c", "AND", &["a", "a"]);
        let graph = CircuitGraph::compile(&netlist).unwrap();
        assert_eq!(fault_universe(&graph).len(), 2 * 2 + 2);
    }
}
