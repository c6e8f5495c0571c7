//! Fault simulation of sequential circuits through a scan chain.
//!
//! With full scan, every flip-flop can be loaded and read directly,
//! so a test vector covers the primary inputs followed by the flip-flops,
//! and a response covers the primary outputs followed by the flip-flops.
//!
//! A [`ScanSimulator`] steps through a clocked test in phases:
//!
//! ```text
//!         scan_in         propagate          capture          scan_out
//!  Idle ──────────▶ ScannedIn ──────▶ Propagated ──────▶ Captured ──────▶ ScannedOut
//!                                       ▲    │ inject                        │
//!                                       │    ▼                               │
//!                                       └────┘◀──────── propagate ───────────┘
//! ```
//!
//! [`ScanSimulator::reset`] returns to `Idle` from any phase,
//! restoring the state the last `scan_in` loaded.

use std::sync::Arc;

use crate::circuit::{Circuit, CircuitGraph, CircuitState, Netlist, SimError, StructuralError, UnboundedResolution};
use crate::config::{ScanConfig, SimConfig};
use crate::fault::Fault;
use crate::sim::FaultDetector;
use crate::value::Value;
use crate::vector::TestVector;

/// The phase of a scan test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanPhase {
    /// Nothing loaded.
    Idle,
    /// A vector was loaded into the inputs and flip-flops.
    ScannedIn,
    /// The combinational logic has settled.
    Propagated,
    /// The flip-flops latched their pending values.
    Captured,
    /// The response was read.
    ScannedOut,
}

/// A fault simulator for full-scan sequential circuits.
#[derive(Debug, Clone)]
pub struct ScanSimulator {
    circuit: Circuit,
    phase: ScanPhase,
    /// The state right after the last `scan_in`.
    loaded: Option<CircuitState>,
    config: ScanConfig,
}

impl ScanSimulator {
    /// Creates a simulator over a compiled circuit.
    pub fn new(graph: impl Into<Arc<CircuitGraph>>, config: &SimConfig) -> Self {
        Self {
            circuit: Circuit::new(graph, config.xor_conflict),
            phase: ScanPhase::Idle,
            loaded: None,
            config: config.scan.clone(),
        }
    }

    /// Compiles a netlist and creates a simulator over it.
    pub fn compile(netlist: &Netlist, config: &SimConfig) -> Result<Self, StructuralError> {
        CircuitGraph::compile(netlist).map(|g| Self::new(g, config))
    }

    /// The simulated circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The current phase.
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// The number of capture cycles needed for any flip-flop's influence to become observable.
    pub fn resolution_length(&self) -> Result<usize, UnboundedResolution> {
        self.circuit.graph().resolution_length()
    }

    /// The number of capture cycles simulated per fault.
    ///
    /// This is the configured count if set, otherwise the resolution length (and at least one).
    pub fn cycle_budget(&self) -> Result<usize, UnboundedResolution> {
        let cycles = match self.config.cycles {
            Some(cycles) => cycles,
            None => self.resolution_length()?,
        };
        Ok(cycles.max(1))
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[ScanPhase]) -> Result<(), SimError> {
        match allowed.contains(&self.phase) {
            true  => Ok(()),
            false => Err(SimError::Phase { operation, phase: self.phase }),
        }
    }

    /// Loads a vector into the primary inputs, then the flip-flops.
    pub fn scan_in(&mut self, vector: &TestVector) -> Result<(), SimError> {
        self.expect_phase("scan in", &[ScanPhase::Idle])?;
        self.circuit.load_scan(vector)?;
        self.loaded = Some(self.circuit.snapshot());
        self.phase = ScanPhase::ScannedIn;
        tracing::debug!(%vector, "scanned in");
        Ok(())
    }

    /// Settles the combinational logic.
    ///
    /// Flip-flops compute their pending values but keep their outputs until captured.
    pub fn propagate(&mut self) -> Result<(), SimError> {
        self.expect_phase("propagate", &[ScanPhase::ScannedIn, ScanPhase::Captured, ScanPhase::ScannedOut])?;
        self.circuit.propagate();
        self.phase = ScanPhase::Propagated;
        Ok(())
    }

    /// Injects a fault into the settled circuit and propagates it through the current cycle.
    pub fn inject(&mut self, fault: Fault) -> Result<(), SimError> {
        self.expect_phase("inject", &[ScanPhase::Propagated])?;
        self.circuit.inject(fault)
    }

    /// Latches every flip-flop.
    pub fn capture(&mut self) -> Result<(), SimError> {
        self.expect_phase("capture", &[ScanPhase::Propagated])?;
        self.circuit.capture();
        self.phase = ScanPhase::Captured;
        Ok(())
    }

    /// Reads the primary outputs, then the flip-flops.
    pub fn scan_out(&mut self) -> Result<Vec<Value>, SimError> {
        self.expect_phase("scan out", &[ScanPhase::Captured, ScanPhase::ScannedOut])?;
        let graph = self.circuit.graph();
        let response = graph.outputs().iter()
            .chain(graph.flip_flops())
            .map(|&k| self.circuit.value(k))
            .collect();
        self.phase = ScanPhase::ScannedOut;
        Ok(response)
    }

    /// Drops any active fault and returns to the state loaded by the last `scan_in`.
    pub fn reset(&mut self) {
        self.circuit.discard_fault();
        if let Some(loaded) = &self.loaded {
            self.circuit.restore(loaded);
        }
        self.phase = ScanPhase::Idle;
    }

    /// Injects a fault into the settled circuit and clocks it until the fault effect
    /// shows in the scanned-out response.
    ///
    /// Returns the number of capture cycles needed, or `None` if the fault stayed hidden
    /// for the whole cycle budget. The fault stays active, so the simulator must be [`reset`]
    /// (or restored) afterwards.
    ///
    /// [`reset`]: ScanSimulator::reset
    pub fn cycles_to_detect(&mut self, fault: Fault) -> Result<Option<usize>, SimError> {
        let budget = self.cycle_budget()?;
        self.inject(fault)?;
        for cycle in 1..=budget {
            if cycle > 1 {
                self.propagate()?;
            }
            self.capture()?;
            if self.scan_out()?.iter().any(|v| v.is_fault()) {
                return Ok(Some(cycle));
            }
        }
        Ok(None)
    }
}

impl FaultDetector for ScanSimulator {
    fn graph(&self) -> &CircuitGraph {
        self.circuit.graph()
    }

    fn vector_width(&self) -> usize {
        let graph = self.circuit.graph();
        graph.inputs().len() + graph.flip_flops().len()
    }

    fn detect(&mut self, vector: &TestVector, candidates: &[Fault]) -> Result<Vec<Fault>, SimError> {
        self.reset();
        self.scan_in(vector)?;
        self.propagate()?;
        let settled = self.circuit.snapshot();

        let mut detected = vec![];
        for &fault in candidates {
            let cycles = self.cycles_to_detect(fault);

            self.circuit.discard_fault();
            self.circuit.restore(&settled);
            self.phase = ScanPhase::Propagated;

            if let Some(cycles) = cycles? {
                tracing::trace!(fault = %fault.display(self.circuit.graph()), cycles, "detected through scan");
                detected.push(fault);
            }
        }
        self.reset();
        tracing::debug!(%vector, candidates = candidates.len(), detected = detected.len(), "simulated scan vector");
        Ok(detected)
    }
}
