//! Module which contains data about circuit state.
//!
//! This notably includes:
//! - [`CircuitState`]: The values of every node in a circuit, plus the active fault
//! - [`NodeState`]: The state of a single node
//!
//! ## Propagation
//!
//! A full propagation evaluates the precomputed levels of the [`CircuitGraph`] in order.
//!
//! Fault propagation is incremental. Starting from the faulted node, nodes are scheduled
//! by their [depth](CircuitGraph::depth), so a node is only evaluated once all of its
//! drivers have settled. Each frontier (the scheduled nodes of the shallowest depth) is
//! evaluated completely (into `value_new`) before any of it is committed (into `value`).
//! The fan-out of every node whose committed value changed is scheduled next, and
//! propagation stops once nothing is scheduled. Flip-flops compute their pending value
//! but only pass their (held) value on when they are the faulted node.
//!
//! The visited frontiers are recorded in evaluation order, so that undoing the fault
//! only has to re-evaluate those nodes without the fault.

use std::collections::BTreeMap;
use std::ops::Index;

use indexmap::IndexSet;
use slotmap::SecondaryMap;

use crate::circuit::{CircuitGraph, NodeKey, SimError};
use crate::fault::{Fault, StuckAt};
use crate::func::{EvalContext, Logic, XorConflict};
use crate::value::Value;

/// The state of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeState {
    /// The committed, visible value.
    pub(crate) value: Value,
    /// The value computed in the current frontier, before being committed.
    ///
    /// For flip-flops this is the pending value, committed on capture.
    pub(crate) value_new: Value,
    /// The value assigned by the current test vector (primary inputs and scanned flip-flops).
    pub(crate) assigned: Value,
    /// The state held by a flip-flop.
    pub(crate) held: Value,
}
impl NodeState {
    /// The committed value.
    pub fn value(&self) -> Value {
        self.value
    }
    /// The most recently evaluated value (the pending value of a flip-flop).
    pub fn pending(&self) -> Value {
        self.value_new
    }
    /// The state held by a flip-flop.
    pub fn held(&self) -> Value {
        self.held
    }
}

/// The fault currently injected, with the frontiers its propagation visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveFault {
    pub(crate) fault: Fault,
    pub(crate) frontiers: Vec<Vec<NodeKey>>,
}

/// The state of the circuit.
///
/// This includes all node values and the active fault overlay.
#[derive(Debug, Clone, Default)]
pub struct CircuitState {
    nodes: SecondaryMap<NodeKey, NodeState>,
    active: Option<ActiveFault>,
    xor_conflict: XorConflict,
}

impl CircuitState {
    /// Creates a state for `graph` where every node is unknown.
    pub fn new(graph: &CircuitGraph, xor_conflict: XorConflict) -> Self {
        let nodes = graph.nodes().map(|(k, _)| (k, NodeState::default())).collect();
        Self { nodes, active: None, xor_conflict }
    }

    /// The committed value of a node.
    pub fn value(&self, key: NodeKey) -> Value {
        self[key].value
    }

    /// The fault currently injected, if any.
    pub fn active_fault(&self) -> Option<Fault> {
        self.active.as_ref().map(|a| a.fault)
    }

    /// The frontiers visited by the active fault's propagation.
    pub fn fault_frontiers(&self) -> Option<&[Vec<NodeKey>]> {
        self.active.as_ref().map(|a| &*a.frontiers)
    }

    /// Whether any of `keys` currently shows a fault effect.
    pub fn shows_fault(&self, keys: &[NodeKey]) -> bool {
        keys.iter().any(|&k| self[k].value.is_fault())
    }

    /// Assigns a value to a primary input.
    pub(crate) fn assign(&mut self, key: NodeKey, value: Value) {
        let state = &mut self.nodes[key];
        state.assigned = value;
        state.value = value;
    }

    /// Loads a value directly into a flip-flop (as a scan chain would).
    pub(crate) fn load(&mut self, key: NodeKey, value: Value) {
        self.nodes[key] = NodeState { value, value_new: value, assigned: value, held: value };
    }

    /// The stuck polarity of a node's output, if the active fault is on it.
    fn output_stuck(&self, key: NodeKey) -> Option<StuckAt> {
        self.active.as_ref()
            .map(|a| a.fault)
            .filter(|f| f.node == key && f.input.is_none())
            .map(|f| f.stuck_at)
    }

    /// The value `consumer` sees on its wire from `driver`.
    fn read(&self, consumer: NodeKey, driver: NodeKey) -> Value {
        let value = self[driver].value;
        match self.active.as_ref().map(|a| a.fault) {
            Some(Fault { node, input: Some(input), stuck_at }) if node == consumer && input == driver => value.stuck(stuck_at),
            _ => value,
        }
    }

    fn evaluate(&self, graph: &CircuitGraph, key: NodeKey) -> Value {
        let node = &graph[key];
        let inputs: Vec<Value> = node.inputs.iter()
            .map(|&i| self.read(key, i))
            .collect();
        node.gate.logic(EvalContext {
            inputs: &inputs,
            assigned: self[key].assigned,
            xor_conflict: self.xor_conflict,
        })
    }

    fn commit(&mut self, graph: &CircuitGraph, key: NodeKey) {
        let stuck = self.output_stuck(key);
        let state = &mut self.nodes[key];
        let raw = match graph[key].is_flip_flop() {
            true  => state.held,
            false => state.value_new,
        };
        state.value = match stuck {
            Some(s) => raw.stuck(s),
            None => raw,
        };
    }

    /// Evaluates every node of a frontier, then commits them all.
    ///
    /// Returns the nodes whose committed value changed.
    pub(crate) fn step(&mut self, graph: &CircuitGraph, frontier: &[NodeKey]) -> Vec<NodeKey> {
        for &key in frontier {
            self.nodes[key].value_new = self.evaluate(graph, key);
        }
        let mut changed = vec![];
        for &key in frontier {
            let old = self.nodes[key].value;
            self.commit(graph, key);
            if self.nodes[key].value != old {
                changed.push(key);
            }
        }
        changed
    }

    /// Settles the whole combinational logic, level by level.
    pub fn propagate(&mut self, graph: &CircuitGraph) {
        for level in graph.levels() {
            self.step(graph, level);
        }
    }

    /// Latches the pending value of every flip-flop.
    pub fn capture(&mut self, graph: &CircuitGraph) {
        for &key in graph.flip_flops() {
            self.nodes[key].held = self.nodes[key].value_new;
            self.commit(graph, key);
        }
    }

    /// Propagates from `start` through every node whose inputs changed,
    /// returning the visited frontiers.
    fn propagate_from(&mut self, graph: &CircuitGraph, start: NodeKey) -> Vec<Vec<NodeKey>> {
        let mut frontiers = vec![];
        let mut scheduled: BTreeMap<usize, IndexSet<NodeKey>> = BTreeMap::new();
        scheduled.entry(graph.depth(start)).or_default().insert(start);

        while let Some((depth, frontier)) = scheduled.pop_first() {
            let frontier: Vec<_> = frontier.into_iter().collect();
            let changed = self.step(graph, &frontier);
            tracing::trace!(depth, nodes = frontier.len(), changed = changed.len(), "evaluated frontier");

            for key in changed {
                for &out in graph[key].outputs() {
                    scheduled.entry(graph.depth(out)).or_default().insert(out);
                }
            }
            frontiers.push(frontier);
        }
        frontiers
    }

    /// Injects a fault and propagates its effect.
    ///
    /// Fails if another fault is already active.
    pub(crate) fn inject(&mut self, graph: &CircuitGraph, fault: Fault) -> Result<(), SimError> {
        if let Some(active) = &self.active {
            return Err(SimError::ConcurrentInjection {
                active: active.fault.display(graph).to_string(),
                requested: fault.display(graph).to_string(),
            });
        }
        self.active = Some(ActiveFault { fault, frontiers: vec![] });
        let frontiers = self.propagate_from(graph, fault.node);
        tracing::debug!(
            fault = %fault.display(graph),
            depth = frontiers.len(),
            nodes = frontiers.iter().map(Vec::len).sum::<usize>(),
            "injected fault"
        );
        if let Some(active) = &mut self.active {
            active.frontiers = frontiers;
        }
        Ok(())
    }

    /// Removes the active fault and restores every node its propagation touched.
    pub(crate) fn undo(&mut self, graph: &CircuitGraph) -> Result<Fault, SimError> {
        let active = self.active.take().ok_or(SimError::NoActiveFault)?;
        for frontier in &active.frontiers {
            self.step(graph, frontier);
        }
        tracing::debug!(fault = %active.fault.display(graph), "undid fault");
        Ok(active.fault)
    }

    /// Drops the fault overlay without restoring any values.
    ///
    /// Only useful when the values are about to be overwritten anyway.
    pub(crate) fn discard_fault(&mut self) -> Option<Fault> {
        self.active.take().map(|a| a.fault)
    }
}

impl Index<NodeKey> for CircuitState {
    type Output = NodeState;

    fn index(&self, index: NodeKey) -> &Self::Output {
        &self.nodes[index]
    }
}
