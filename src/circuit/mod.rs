//! Circuit module used to build and simulate circuits.
//!
//! A [`Circuit`] pairs a shared, immutable [`CircuitGraph`] with its own [`CircuitState`],
//! so cloning a circuit gives an independent simulator over the same structure.

pub mod graph;
pub mod netlist;
pub mod state;

use std::sync::Arc;

pub use graph::{CircuitGraph, Node, NodeKey, Role, StructuralError, UnboundedResolution};
pub use netlist::{GateDecl, Netlist};
pub use state::{CircuitState, NodeState};

use crate::fault::{Fault, FaultError};
use crate::func::XorConflict;
use crate::scan::ScanPhase;
use crate::value::Value;
use crate::vector::{TestVector, VectorError};

/// Errors which can occur while simulating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    /// A fault was injected while another one was still active.
    #[error("cannot inject {requested} while {active} is still active")]
    ConcurrentInjection {
        /// The fault which is active.
        active: String,
        /// The fault which was requested.
        requested: String,
    },
    /// A fault was undone, but none was active.
    #[error("no fault is active")]
    NoActiveFault,
    /// A vector was applied while a fault was still active.
    #[error("cannot apply a test vector while {0} is active")]
    FaultStillActive(String),
    /// A test vector did not match the circuit.
    #[error(transparent)]
    Vector(#[from] VectorError),
    /// A scan operation was called in the wrong phase.
    #[error("cannot {operation} in phase {phase:?}")]
    Phase {
        /// The operation which was attempted.
        operation: &'static str,
        /// The phase the simulator was in.
        phase: ScanPhase,
    },
    /// The number of cycles to simulate could not be determined.
    #[error(transparent)]
    Unbounded(#[from] UnboundedResolution),
    /// A fault could not be built.
    #[error(transparent)]
    Fault(#[from] FaultError),
}

/// A circuit, which includes its structure ([`CircuitGraph`]) and its state ([`CircuitState`]).
#[derive(Debug, Clone)]
pub struct Circuit {
    graph: Arc<CircuitGraph>,
    state: CircuitState,
}

impl Circuit {
    /// Creates a circuit with every node unknown.
    pub fn new(graph: impl Into<Arc<CircuitGraph>>, xor_conflict: XorConflict) -> Self {
        let graph = graph.into();
        let state = CircuitState::new(&graph, xor_conflict);
        Self { graph, state }
    }

    /// Compiles a netlist into a circuit.
    pub fn compile(netlist: &Netlist, xor_conflict: XorConflict) -> Result<Self, StructuralError> {
        CircuitGraph::compile(netlist).map(|g| Self::new(g, xor_conflict))
    }

    /// The structure of this circuit.
    pub fn graph(&self) -> &CircuitGraph {
        &self.graph
    }
    /// A shared handle to the structure of this circuit.
    pub fn shared_graph(&self) -> Arc<CircuitGraph> {
        Arc::clone(&self.graph)
    }

    /// Gets current circuit state.
    pub fn state(&self) -> &CircuitState {
        &self.state
    }

    /// The committed value of a node.
    pub fn value(&self, key: NodeKey) -> Value {
        self.state.value(key)
    }

    /// The values of `keys`, in order.
    pub fn values(&self, keys: &[NodeKey]) -> Vec<Value> {
        keys.iter().map(|&k| self.state.value(k)).collect()
    }

    fn ensure_no_fault(&self) -> Result<(), SimError> {
        match self.state.active_fault() {
            Some(f) => Err(SimError::FaultStillActive(f.display(&self.graph).to_string())),
            None => Ok(()),
        }
    }

    /// Assigns a test vector to the primary inputs, without propagating.
    pub fn assign_inputs(&mut self, vector: &TestVector) -> Result<(), SimError> {
        self.ensure_no_fault()?;
        vector.expect_width(self.graph.inputs().len())?;
        for (&key, value) in self.graph.inputs().iter().zip(vector.iter()) {
            self.state.assign(key, value);
        }
        Ok(())
    }

    /// Assigns a test vector to the primary inputs followed by the flip-flops,
    /// loading the flip-flops directly.
    pub fn load_scan(&mut self, vector: &TestVector) -> Result<(), SimError> {
        self.ensure_no_fault()?;
        let inputs = self.graph.inputs().len();
        vector.expect_width(inputs + self.graph.flip_flops().len())?;

        self.assign_inputs(&vector.slice(0..inputs))?;
        for (&key, value) in self.graph.flip_flops().iter().zip(vector.iter().skip(inputs)) {
            self.state.load(key, value);
        }
        Ok(())
    }

    /// Applies a test vector to the primary inputs and settles the circuit.
    pub fn apply(&mut self, vector: &TestVector) -> Result<(), SimError> {
        self.assign_inputs(vector)?;
        self.propagate();
        Ok(())
    }

    /// Settles the whole combinational logic.
    pub fn propagate(&mut self) {
        self.state.propagate(&self.graph);
    }

    /// Latches every flip-flop.
    pub fn capture(&mut self) {
        self.state.capture(&self.graph);
    }

    /// Injects a fault and propagates its effect from the fault point.
    pub fn inject(&mut self, fault: Fault) -> Result<(), SimError> {
        self.state.inject(&self.graph, fault)
    }

    /// Removes the active fault, restoring every value its propagation changed.
    ///
    /// Flip-flop state captured while the fault was active is not restored.
    pub fn undo(&mut self) -> Result<Fault, SimError> {
        self.state.undo(&self.graph)
    }

    /// Drops the active fault without restoring any values.
    pub fn discard_fault(&mut self) -> Option<Fault> {
        self.state.discard_fault()
    }

    /// The fault currently injected, if any.
    pub fn active_fault(&self) -> Option<Fault> {
        self.state.active_fault()
    }

    /// Whether the fault effect is visible at any primary output.
    pub fn fault_observed(&self) -> bool {
        self.state.shows_fault(self.graph.outputs())
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> CircuitState {
        self.state.clone()
    }

    /// Restores a state taken with [`Circuit::snapshot`].
    pub fn restore(&mut self, snapshot: &CircuitState) {
        self.state.clone_from(snapshot);
    }
}
