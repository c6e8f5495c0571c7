//! Property tests over randomly generated combinational circuits.

use std::collections::HashSet;

use proptest::prelude::*;
use proptest::sample::Index;

use crate::circuit::{Circuit, CircuitGraph, Netlist};
use crate::config::SimConfig;
use crate::func::XorConflict;
use crate::sim::{Campaign, CoverageMode, FaultDetector, FaultSimulator};
use crate::vector::TestVector;

const KINDS: [&str; 8] = ["AND", "OR", "NAND", "NOR", "XOR", "XNOR", "NOT", "BUFF"];

/// A random DAG: every gate reads from inputs or earlier gates,
/// and every gate nothing reads from is an output.
fn netlist() -> impl Strategy<Value = Netlist> {
    let gate = (0..KINDS.len(), prop::collection::vec(any::<Index>(), 1..4));
    (1usize..5, prop::collection::vec(gate, 1..12)).prop_map(|(n_inputs, gates)| {
        let mut netlist = Netlist::new();
        let mut names: Vec<String> = (0..n_inputs).map(|i| format!("i{i}")).collect();
        for name in &names {
            netlist = netlist.input(name);
        }

        let mut used = HashSet::new();
        let mut gate_names = vec![];
        for (g, (kind, picks)) in gates.into_iter().enumerate() {
            let kind = KINDS[kind];
            let arity = if matches!(kind, "NOT" | "BUFF") { 1 } else { picks.len() };
            let inputs: Vec<String> = picks[..arity].iter()
                .map(|ix| names[ix.index(names.len())].clone())
                .collect();
            used.extend(inputs.iter().cloned());

            let name = format!("g{g}");
            let refs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            netlist = netlist.gate(&name, kind, &refs);
            names.push(name.clone());
            gate_names.push(name);
        }
        for name in gate_names.iter().filter(|n| !used.contains(*n)) {
            netlist = netlist.output(name);
        }
        netlist
    })
}

fn vector(bits: &[bool], width: usize) -> TestVector {
    bits.iter().copied().cycle().take(width).collect()
}

fn all_values(circuit: &Circuit) -> Vec<crate::value::Value> {
    let keys: Vec<_> = circuit.graph().nodes().map(|(k, _)| k).collect();
    circuit.values(&keys)
}

proptest! {
    #[test]
    fn universe_size(netlist in netlist()) {
        let graph = CircuitGraph::compile(&netlist).unwrap();
        let edges: usize = graph.nodes()
            .map(|(_, n)| n.inputs().iter().collect::<HashSet<_>>().len())
            .sum();
        prop_assert_eq!(graph.edge_count(), edges);
        prop_assert_eq!(graph.fault_universe().len(), 2 * graph.len() + 2 * edges);
    }

    #[test]
    fn inject_undo_round_trip(netlist in netlist(), bits in prop::collection::vec(any::<bool>(), 1..5)) {
        let mut circuit = Circuit::compile(&netlist, XorConflict::Mask).unwrap();
        let width = circuit.graph().inputs().len();
        circuit.apply(&vector(&bits, width)).unwrap();

        let before = all_values(&circuit);
        let fan_in: Vec<Vec<_>> = circuit.graph().nodes().map(|(_, n)| n.inputs().to_vec()).collect();

        for fault in circuit.graph().fault_universe() {
            circuit.inject(fault).unwrap();
            prop_assert_eq!(circuit.undo(), Ok(fault));
            prop_assert_eq!(&all_values(&circuit), &before, "{} was not undone", fault.display(circuit.graph()));
        }
        let after: Vec<Vec<_>> = circuit.graph().nodes().map(|(_, n)| n.inputs().to_vec()).collect();
        prop_assert_eq!(fan_in, after);
    }

    #[test]
    fn incremental_matches_full_propagation(
        netlist in netlist(),
        bits in prop::collection::vec(any::<bool>(), 1..5),
        exact in any::<bool>(),
    ) {
        let conflict = if exact { XorConflict::Exact } else { XorConflict::Mask };
        let mut circuit = Circuit::compile(&netlist, conflict).unwrap();
        let width = circuit.graph().inputs().len();
        circuit.apply(&vector(&bits, width)).unwrap();
        let outputs = circuit.graph().outputs().to_vec();

        for fault in circuit.graph().fault_universe() {
            circuit.inject(fault).unwrap();
            let mut full = circuit.clone();
            full.propagate();
            prop_assert_eq!(circuit.values(&outputs), full.values(&outputs), "{}", fault.display(circuit.graph()));
            circuit.undo().unwrap();
        }
    }

    #[test]
    fn dropping_detects_the_same_faults(
        netlist in netlist(),
        bits in prop::collection::vec(prop::collection::vec(any::<bool>(), 1..5), 1..6),
    ) {
        let sim = FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        let width = sim.vector_width();
        let vectors: Vec<_> = bits.iter().map(|b| vector(b, width)).collect();

        let mut campaign = Campaign::new(sim.clone());
        let faults = campaign.detector().fault_universe();
        let full = campaign.run(&vectors, &faults, CoverageMode::Full).unwrap();

        let mut campaign = Campaign::new(sim);
        let dropping = campaign.run(&vectors, &faults, CoverageMode::Dropping).unwrap();

        prop_assert_eq!(full.detected(), dropping.detected());
        prop_assert_eq!(full.remaining, dropping.remaining);
    }
}
