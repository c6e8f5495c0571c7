//! Types for describing the structure of a circuit.
//!
//! This module notably includes:
//! - [`CircuitGraph`]: The compiled, immutable structure of a circuit
//! - [`Node`]: A named gate together with its fan-in and fan-out
//! - [`StructuralError`]: Everything that can go wrong when compiling a [`Netlist`]

use std::collections::HashMap;
use std::ops::Index;

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::circuit::Netlist;
use crate::fault::{self, Fault};
use crate::func::{GateFn, Logic};

new_key_type! {
    /// Key type for maps to nodes.
    pub struct NodeKey;
}

/// What a node is to the outside of the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// A primary input.
    Input,
    /// A primary output (observable).
    Output,
    /// Anything else.
    Intermediate,
}

/// A node of the circuit: one gate and the wires around it.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) gate: GateFn,
    pub(crate) role: Role,
    /// Fan-in, in declaration order.
    pub(crate) inputs: Vec<NodeKey>,
    /// Fan-out, without duplicates.
    pub(crate) outputs: Vec<NodeKey>,
}
impl Node {
    fn new(name: &str, gate: GateFn) -> Self {
        Self { name: name.to_string(), gate, role: Role::Intermediate, inputs: vec![], outputs: vec![] }
    }

    /// The node's name.
    pub fn name(&self) -> &str {
        &self.name
    }
    /// The gate driving this node.
    pub fn gate(&self) -> GateFn {
        self.gate
    }
    /// The node's role.
    pub fn role(&self) -> Role {
        self.role
    }
    /// The nodes feeding this one, in declaration order.
    pub fn inputs(&self) -> &[NodeKey] {
        &self.inputs
    }
    /// The nodes this one feeds.
    pub fn outputs(&self) -> &[NodeKey] {
        &self.outputs
    }
    /// Whether this node is a flip-flop.
    pub fn is_flip_flop(&self) -> bool {
        self.gate.is_flip_flop()
    }
}

/// Errors which make a netlist impossible to simulate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// A gate reads from (or an output names) a node which was never declared.
    #[error("{gate:?} refers to undeclared node {input:?}")]
    DanglingReference {
        /// The gate (or `OUTPUT`) holding the reference.
        gate: String,
        /// The missing node.
        input: String,
    },
    /// The gate kind is not supported.
    #[error("gate {gate:?} has unknown kind {kind:?}")]
    UnknownGateKind {
        /// The gate.
        gate: String,
        /// Its kind.
        kind: String,
    },
    /// The gate has the wrong number of inputs for its kind.
    #[error("{kind} gate {gate:?} takes {expected}, but has {found}")]
    Arity {
        /// The gate.
        gate: String,
        /// Its kind.
        kind: &'static str,
        /// What its kind accepts.
        expected: crate::func::Arity,
        /// How many inputs it has.
        found: usize,
    },
    /// Two nodes share a name.
    #[error("node {0:?} is declared more than once")]
    DuplicateNode(String),
    /// The combinational logic has a loop (one not broken by a flip-flop).
    #[error("combinational cycle through {node:?}")]
    CombinationalCycle {
        /// A node on the cycle.
        node: String,
    },
}

/// A flip-flop that feeds back into itself through other flip-flops,
/// so its effects never settle into a bounded number of cycles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("flip-flop {flip_flop:?} reaches itself, resolution length is unbounded")]
pub struct UnboundedResolution {
    /// The flip-flop which reaches itself.
    pub flip_flop: String,
}

/// A compiled circuit structure.
///
/// The graph is immutable once compiled.
/// All mutable simulation data is held by [`CircuitState`](crate::circuit::CircuitState).
#[derive(Debug, Clone)]
pub struct CircuitGraph {
    nodes: SlotMap<NodeKey, Node>,
    /// Name lookup, in declaration order.
    names: IndexMap<String, NodeKey>,
    inputs: Vec<NodeKey>,
    outputs: Vec<NodeKey>,
    flip_flops: Vec<NodeKey>,
    /// Evaluation order for a full propagation.
    levels: Vec<Vec<NodeKey>>,
    /// The level of every node (primary inputs are at depth 0).
    depth: SecondaryMap<NodeKey, usize>,
    resolution: Result<usize, UnboundedResolution>,
}

impl CircuitGraph {
    /// Links a netlist into a circuit graph.
    ///
    /// This also rejects combinational cycles and precomputes the evaluation levels
    /// and the flip-flop resolution length.
    pub fn compile(netlist: &Netlist) -> Result<Self, StructuralError> {
        let mut nodes: SlotMap<NodeKey, Node> = SlotMap::with_key();
        let mut names: IndexMap<String, NodeKey> = IndexMap::new();
        let mut declare = |name: &str, gate: GateFn| {
            if names.contains_key(name) {
                return Err(StructuralError::DuplicateNode(name.to_string()));
            }
            let key = nodes.insert(Node::new(name, gate));
            names.insert(name.to_string(), key);
            Ok(key)
        };

        let inputs = netlist.inputs.iter()
            .map(|name| declare(name.as_str(), crate::func::Input.into()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut gates = Vec::with_capacity(netlist.gates.len());
        for decl in &netlist.gates {
            let unknown = || StructuralError::UnknownGateKind { gate: decl.name.clone(), kind: decl.kind.clone() };
            let gate: GateFn = decl.kind.parse().map_err(|_| unknown())?;
            if matches!(gate, GateFn::Input(_)) {
                return Err(unknown());
            }
            if !gate.arity().accepts(decl.inputs.len()) {
                return Err(StructuralError::Arity {
                    gate: decl.name.clone(),
                    kind: gate.name(),
                    expected: gate.arity(),
                    found: decl.inputs.len(),
                });
            }
            gates.push((declare(decl.name.as_str(), gate)?, decl));
        }

        // Link fan-in and fan-out
        for (key, decl) in gates {
            for input in &decl.inputs {
                let &driver = names.get(input).ok_or_else(|| StructuralError::DanglingReference {
                    gate: decl.name.clone(),
                    input: input.clone(),
                })?;
                nodes[key].inputs.push(driver);
                if !nodes[driver].outputs.contains(&key) {
                    nodes[driver].outputs.push(key);
                }
            }
        }

        for &key in &inputs {
            nodes[key].role = Role::Input;
        }
        let outputs = netlist.outputs.iter()
            .map(|name| names.get(name).copied().ok_or_else(|| StructuralError::DanglingReference {
                gate: "OUTPUT".to_string(),
                input: name.clone(),
            }))
            .collect::<Result<Vec<_>, _>>()?;
        for &key in &outputs {
            nodes[key].role = Role::Output;
        }

        let flip_flops = names.values()
            .copied()
            .filter(|&k| nodes[k].is_flip_flop())
            .collect();

        let mut graph = Self { nodes, names, inputs, outputs, flip_flops, levels: vec![], depth: SecondaryMap::new(), resolution: Ok(0) };
        graph.levels = graph.levelize()?;
        graph.depth = graph.inputs.iter().map(|&k| (k, 0)).collect();
        for (d, level) in graph.levels.iter().enumerate() {
            for &key in level {
                graph.depth.insert(key, d + 1);
            }
        }
        graph.resolution = graph.resolve_flip_flops();
        tracing::debug!(
            nodes = graph.len(),
            edges = graph.edge_count(),
            levels = graph.levels.len(),
            flip_flops = graph.flip_flops.len(),
            "compiled circuit"
        );
        Ok(graph)
    }

    /// Sorts the combinational logic topologically and groups it by depth.
    ///
    /// Primary inputs and flip-flop outputs are the sources at depth 0 (and are not included).
    /// Every other node lands one level after its deepest driver,
    /// and flip-flops are also evaluated (to compute their pending value).
    fn levelize(&self) -> Result<Vec<Vec<NodeKey>>, StructuralError> {
        let mut dag = DiGraph::<NodeKey, ()>::with_capacity(self.len(), self.edge_count());
        let index: HashMap<NodeKey, NodeIndex> = self.names.values()
            .map(|&k| (k, dag.add_node(k)))
            .collect();
        for (key, node) in self.nodes() {
            if node.is_flip_flop() {
                continue;
            }
            for out in &node.outputs {
                dag.add_edge(index[&key], index[out], ());
            }
        }

        let order = toposort(&dag, None).map_err(|cycle| StructuralError::CombinationalCycle {
            node: self[dag[cycle.node_id()]].name.clone(),
        })?;

        let mut depth: HashMap<NodeKey, usize> = HashMap::with_capacity(order.len());
        let mut levels: Vec<Vec<NodeKey>> = vec![];
        for key in order.into_iter().map(|ix| dag[ix]) {
            let node = &self[key];
            if matches!(node.gate, GateFn::Input(_)) {
                continue;
            }
            let d = 1 + node.inputs.iter()
                .filter(|&&i| !self[i].is_flip_flop())
                .map(|i| depth.get(i).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);
            depth.insert(key, d);
            if levels.len() < d {
                levels.resize_with(d, Vec::new);
            }
            levels[d - 1].push(key);
        }

        // Keep a deterministic (declaration) order within each level
        let position = |k: &NodeKey| self.names.get_index_of(&self[*k].name);
        for level in &mut levels {
            level.sort_by_key(position);
        }
        Ok(levels)
    }

    /// Computes how many capture cycles a flip-flop's influence needs to reach
    /// a point where it can be observed.
    fn resolve_flip_flops(&self) -> Result<usize, UnboundedResolution> {
        let mut memo = HashMap::new();
        let mut on_stack = IndexSet::new();
        let mut longest = 0;
        for &ff in &self.flip_flops {
            longest = longest.max(self.resolution_of(ff, &mut memo, &mut on_stack)?);
        }
        Ok(longest)
    }

    fn resolution_of(
        &self,
        ff: NodeKey,
        memo: &mut HashMap<NodeKey, usize>,
        on_stack: &mut IndexSet<NodeKey>,
    ) -> Result<usize, UnboundedResolution> {
        if let Some(&len) = memo.get(&ff) {
            return Ok(len);
        }
        on_stack.insert(ff);

        let mut len = 1;
        for reached in self.reachable_flip_flops(ff) {
            if on_stack.contains(&reached) {
                return Err(UnboundedResolution { flip_flop: self[reached].name.clone() });
            }
            len = len.max(1 + self.resolution_of(reached, memo, on_stack)?);
        }

        on_stack.shift_remove(&ff);
        memo.insert(ff, len);
        Ok(len)
    }

    /// The flip-flops reached from `ff`'s output through combinational logic only.
    fn reachable_flip_flops(&self, ff: NodeKey) -> IndexSet<NodeKey> {
        let mut reached = IndexSet::new();
        let mut visited = IndexSet::new();
        let mut stack = self[ff].outputs.clone();
        while let Some(key) = stack.pop() {
            if !visited.insert(key) {
                continue;
            }
            match self[key].is_flip_flop() {
                true  => { reached.insert(key); },
                false => stack.extend_from_slice(&self[key].outputs),
            }
        }
        reached
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// Whether the circuit has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// The number of distinct driver/consumer pairs.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.outputs.len()).sum()
    }

    /// Looks up a node by name.
    pub fn node(&self, name: &str) -> Option<NodeKey> {
        self.names.get(name).copied()
    }
    /// All nodes, in declaration order (primary inputs first).
    pub fn nodes(&self) -> impl Iterator<Item = (NodeKey, &Node)> + '_ {
        self.names.values().map(|&k| (k, &self.nodes[k]))
    }
    /// Primary inputs, in declaration order.
    pub fn inputs(&self) -> &[NodeKey] {
        &self.inputs
    }
    /// Primary outputs, in declaration order.
    pub fn outputs(&self) -> &[NodeKey] {
        &self.outputs
    }
    /// Flip-flops, in declaration order.
    pub fn flip_flops(&self) -> &[NodeKey] {
        &self.flip_flops
    }
    /// Whether the circuit holds state.
    pub fn is_sequential(&self) -> bool {
        !self.flip_flops.is_empty()
    }
    /// The evaluation levels of a full propagation.
    pub fn levels(&self) -> &[Vec<NodeKey>] {
        &self.levels
    }

    /// The evaluation depth of a node.
    ///
    /// Every node lies deeper than all of its drivers, except for drivers which are flip-flops.
    pub fn depth(&self, key: NodeKey) -> usize {
        self.depth.get(key).copied().unwrap_or(0)
    }

    /// The number of capture cycles needed for any flip-flop's influence to become observable.
    ///
    /// This is `0` for combinational circuits.
    pub fn resolution_length(&self) -> Result<usize, UnboundedResolution> {
        self.resolution.clone()
    }

    /// Every single stuck-at fault of this circuit (see [`fault::fault_universe`]).
    pub fn fault_universe(&self) -> IndexSet<Fault> {
        fault::fault_universe(self)
    }

    /// The nodes reached from `frontier` in one step.
    ///
    /// Flip-flops only pass values on when `through_flip_flops` is set.
    pub fn expand(&self, frontier: &[NodeKey], through_flip_flops: bool) -> Vec<NodeKey> {
        let next: IndexSet<_> = frontier.iter()
            .filter(|&&k| through_flip_flops || !self[k].is_flip_flop())
            .flat_map(|&k| self[k].outputs.iter().copied())
            .collect();
        next.into_iter().collect()
    }

    /// The static cone of influence of a node, grouped by distance.
    ///
    /// Stops at flip-flops (which are included, but not expanded).
    pub fn cone(&self, start: NodeKey) -> Vec<Vec<NodeKey>> {
        let mut cone = vec![];
        let mut frontier = vec![start];
        let mut first = true;
        while !frontier.is_empty() {
            let next = self.expand(&frontier, first);
            cone.push(std::mem::replace(&mut frontier, next));
            first = false;
        }
        cone
    }
}

impl Index<NodeKey> for CircuitGraph {
    type Output = Node;

    fn index(&self, index: NodeKey) -> &Self::Output {
        &self.nodes[index]
    }
}
