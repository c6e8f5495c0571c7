//! Fault simulation.
//!
//! ## This module notably consists of:
//! - **[`FaultSimulator`]**: Single-fault simulation of a circuit without scan access.
//!   A vector is applied once, then every candidate fault is injected, checked at the
//!   primary outputs and undone again.
//! - **[`FaultDetector`]**: The interface shared with the scan simulator
//!   ([`ScanSimulator`](crate::scan::ScanSimulator)), which is what [`Campaign`] drives.
//! - **[`Campaign`]**: Runs whole vector sets and keeps track of coverage.

pub mod campaign;

use std::sync::Arc;

use indexmap::IndexSet;

pub use campaign::{Campaign, CampaignReport, CampaignResult, CoverageCache, CoverageMode};
pub use crate::circuit::SimError;

use crate::circuit::{Circuit, CircuitGraph, Netlist, StructuralError};
use crate::config::SimConfig;
use crate::fault::Fault;
use crate::vector::TestVector;

/// Something which can tell which faults a test vector detects.
pub trait FaultDetector {
    /// The circuit being simulated.
    fn graph(&self) -> &CircuitGraph;

    /// The width of the test vectors this detector accepts.
    fn vector_width(&self) -> usize;

    /// Applies `vector` and returns the faults of `candidates` it detects, in order.
    fn detect(&mut self, vector: &TestVector, candidates: &[Fault]) -> Result<Vec<Fault>, SimError>;

    /// Every fault of the circuit.
    fn fault_universe(&self) -> IndexSet<Fault> {
        self.graph().fault_universe()
    }
}

/// A fault simulator for a circuit observed only through its primary outputs.
#[derive(Debug, Clone)]
pub struct FaultSimulator {
    circuit: Circuit,
}

impl FaultSimulator {
    /// Creates a simulator over a compiled circuit.
    pub fn new(graph: impl Into<Arc<CircuitGraph>>, config: &SimConfig) -> Self {
        Self { circuit: Circuit::new(graph, config.xor_conflict) }
    }

    /// Compiles a netlist and creates a simulator over it.
    pub fn compile(netlist: &Netlist, config: &SimConfig) -> Result<Self, StructuralError> {
        CircuitGraph::compile(netlist).map(|g| Self::new(g, config))
    }

    /// The simulated circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Applies a test vector to the primary inputs and settles the fault-free circuit.
    pub fn apply_vector(&mut self, vector: &TestVector) -> Result<(), SimError> {
        self.circuit.apply(vector)?;
        tracing::debug!(%vector, "applied test vector");
        Ok(())
    }

    /// Injects a fault into the settled circuit.
    pub fn inject(&mut self, fault: Fault) -> Result<(), SimError> {
        self.circuit.inject(fault)
    }

    /// Removes the active fault.
    pub fn undo(&mut self) -> Result<Fault, SimError> {
        self.circuit.undo()
    }

    /// Whether the active fault is visible at a primary output.
    pub fn is_detected(&self) -> bool {
        self.circuit.fault_observed()
    }

    /// Checks whether the current vector detects a single fault.
    pub fn detect_fault(&mut self, fault: Fault) -> Result<bool, SimError> {
        self.inject(fault)?;
        let detected = self.is_detected();
        self.undo()?;
        Ok(detected)
    }

    /// Applies a test vector and returns every fault of the circuit it detects.
    pub fn detect_faults(&mut self, vector: &TestVector) -> Result<Vec<Fault>, SimError> {
        let universe: Vec<_> = self.circuit.graph().fault_universe().into_iter().collect();
        self.detect(vector, &universe)
    }
}

impl FaultDetector for FaultSimulator {
    fn graph(&self) -> &CircuitGraph {
        self.circuit.graph()
    }

    fn vector_width(&self) -> usize {
        self.circuit.graph().inputs().len()
    }

    fn detect(&mut self, vector: &TestVector, candidates: &[Fault]) -> Result<Vec<Fault>, SimError> {
        self.apply_vector(vector)?;
        let mut detected = vec![];
        for &fault in candidates {
            if self.detect_fault(fault)? {
                detected.push(fault);
            }
        }
        tracing::debug!(%vector, candidates = candidates.len(), detected = detected.len(), "simulated vector");
        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::StuckAt;
    use crate::vector::VectorError;

    fn simulator(netlist: Netlist) -> FaultSimulator {
        FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap()
    }
    fn names(sim: &FaultSimulator, faults: &[Fault]) -> Vec<String> {
        faults.iter().map(|f| f.display(sim.graph()).to_string()).collect()
    }

    #[test]
    fn test_detect_faults() {
        let mut sim = simulator(Netlist::new()
            .input("a")
            .input("b")
            .output("c")
            .gate("c", "NOR", &["a", "b"]));

        let detected = sim.detect_faults(&"00".parse().unwrap()).unwrap();
        assert_eq!(names(&sim, &detected), ["a-1", "b-1", "c-0", "c-a-1", "c-b-1"]);

        let detected = sim.detect_faults(&"10".parse().unwrap()).unwrap();
        assert_eq!(names(&sim, &detected), ["a-0", "c-1", "c-a-0"]);
    }

    #[test]
    fn test_detect_leaves_circuit_clean() {
        let mut sim = simulator(Netlist::new()
            .input("a")
            .input("b")
            .output("d")
            .gate("c", "XOR", &["a", "b"])
            .gate("d", "AND", &["c", "a"]));

        sim.apply_vector(&"10".parse().unwrap()).unwrap();
        let before = sim.circuit().values(&sim.graph().nodes().map(|(k, _)| k).collect::<Vec<_>>());

        let c = sim.graph().node("c").unwrap();
        assert!(sim.detect_fault(Fault::on_node(c, StuckAt::Zero)).unwrap());
        assert!(!sim.detect_fault(Fault::on_node(c, StuckAt::One)).unwrap());

        let after = sim.circuit().values(&sim.graph().nodes().map(|(k, _)| k).collect::<Vec<_>>());
        assert_eq!(before, after);
        assert_eq!(sim.circuit().active_fault(), None);
    }

    #[test]
    fn test_width_mismatch() {
        let mut sim = simulator(Netlist::new().input("a").output("b").gate("b", "NOT", &["a"]));
        assert_eq!(sim.vector_width(), 1);
        assert_eq!(
            sim.detect_faults(&"01".parse().unwrap()),
            Err(SimError::Vector(VectorError::Width { expected: 1, found: 2 }))
        );
    }
}
