#![warn(missing_docs)]
//! Gate-level stuck-at fault simulation.
//!
//! Given a circuit (as a [`Netlist`](circuit::Netlist)) and a set of test vectors,
//! this crate works out which single stuck-at faults the vectors expose at the circuit's
//! outputs, using the five-valued D-algebra ([`Value`](value::Value)).
//!
//! Combinational circuits are simulated with a [`FaultSimulator`](sim::FaultSimulator),
//! full-scan sequential circuits with a [`ScanSimulator`](scan::ScanSimulator),
//! and whole vector sets are run through a [`Campaign`](sim::Campaign).
//!
//! ```
//! use faultsim_engine::circuit::Netlist;
//! use faultsim_engine::config::SimConfig;
//! use faultsim_engine::fault::Fault;
//! use faultsim_engine::sim::{FaultDetector, FaultSimulator};
//!
//! let netlist = Netlist::new()
//!     .input("a")
//!     .input("b")
//!     .output("c")
//!     .gate("c", "AND", &["a", "b"]);
//! let mut sim = FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap();
//!
//! let detected = sim.detect_faults(&"11".parse().unwrap()).unwrap();
//! let names: Vec<_> = detected.iter().map(|f| f.display(sim.graph()).to_string()).collect();
//! assert_eq!(names, ["a-0", "b-0", "c-0", "c-a-0", "c-b-0"]);
//! # let _ = Fault::parse(sim.graph(), "c-0").unwrap();
//! ```

pub mod circuit;
pub mod config;
pub mod fault;
pub mod func;
pub mod generator;
pub mod scan;
pub mod sim;
pub mod value;
pub mod vector;

#[cfg(test)]
mod tests_properties;

#[cfg(test)]
mod tests {
    use crate::circuit::{CircuitGraph, Netlist, StructuralError, UnboundedResolution};
    use crate::config::{standard_generators, SimConfig};
    use crate::fault::Fault;
    use crate::scan::ScanSimulator;
    use crate::sim::{Campaign, CoverageMode, FaultDetector, FaultSimulator, SimError};
    use crate::vector::TestVector;

    fn tv(bits: &str) -> TestVector {
        bits.parse().unwrap()
    }

    #[test]
    fn and2() {
        let netlist = Netlist::new()
            .input("a")
            .input("b")
            .output("c")
            .gate("c", "AND", &["a", "b"]);
        let mut sim = FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        let c0 = Fault::parse(sim.graph(), "c-0").unwrap();
        let c1 = Fault::parse(sim.graph(), "c-1").unwrap();

        sim.apply_vector(&tv("11")).unwrap();
        assert!(sim.detect_fault(c0).unwrap(), "11 should detect c-0");
        assert!(!sim.detect_fault(c1).unwrap(), "11 should not detect c-1");

        sim.apply_vector(&tv("00")).unwrap();
        assert!(sim.detect_fault(c1).unwrap(), "00 should detect c-1");
        assert!(!sim.detect_fault(c0).unwrap(), "00 should not detect c-0");
    }

    #[test]
    fn concurrent_injection() {
        let netlist = Netlist::new()
            .input("a")
            .input("b")
            .output("c")
            .gate("c", "AND", &["a", "b"]);
        let mut sim = FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        let c0 = Fault::parse(sim.graph(), "c-0").unwrap();
        let a1 = Fault::parse(sim.graph(), "a-1").unwrap();

        sim.apply_vector(&tv("11")).unwrap();
        sim.inject(c0).unwrap();
        assert!(matches!(sim.inject(a1), Err(SimError::ConcurrentInjection { .. })));
        assert_eq!(sim.undo(), Ok(c0));
        assert_eq!(sim.undo(), Err(SimError::NoActiveFault));
    }

    #[test]
    fn c17() {
        // ISCAS-85 c17
        let netlist = Netlist::new()
            .input("1")
            .input("2")
            .input("3")
            .input("6")
            .input("7")
            .output("22")
            .output("23")
            .gate("10", "NAND", &["1", "3"])
            .gate("11", "NAND", &["3", "6"])
            .gate("16", "NAND", &["2", "11"])
            .gate("19", "NAND", &["11", "7"])
            .gate("22", "NAND", &["10", "16"])
            .gate("23", "NAND", &["16", "19"]);
        let sim = FaultSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        let universe = sim.fault_universe();
        assert_eq!(universe.len(), 2 * 11 + 2 * 12);

        let vectors: Vec<_> = (0..32).map(|n| TestVector::from_bits(n, 5)).collect();
        let mut campaign = Campaign::new(sim);
        let result = campaign.run(&vectors, &universe, CoverageMode::Dropping).unwrap();
        assert!(result.remaining.is_empty(), "c17 has no redundant faults");
        assert_eq!(result.coverage(), 1.0);
    }

    #[test]
    fn scan_flip_flop() {
        let netlist = Netlist::new()
            .input("d")
            .output("q")
            .gate("q", "DFF", &["d"]);
        let mut sim = ScanSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        assert_eq!(sim.resolution_length(), Ok(1));

        let d0 = Fault::parse(sim.graph(), "d-0").unwrap();
        sim.scan_in(&tv("10")).unwrap();
        sim.propagate().unwrap();
        assert_eq!(sim.cycles_to_detect(d0), Ok(Some(1)));

        assert_eq!(sim.detect(&tv("10"), &[d0]), Ok(vec![d0]));
        assert_eq!(sim.detect(&tv("00"), &[d0]), Ok(vec![]));
    }

    #[test]
    fn scan_campaign() {
        // a 2-bit shift register with an enable
        let netlist = Netlist::new()
            .input("si")
            .input("en")
            .output("so")
            .gate("m0", "AND", &["si", "en"])
            .gate("q0", "DFF", &["m0"])
            .gate("m1", "AND", &["q0", "en"])
            .gate("q1", "DFF", &["m1"])
            .gate("so", "BUFF", &["q1"]);
        let sim = ScanSimulator::compile(&netlist, &SimConfig::default()).unwrap();
        assert_eq!(sim.vector_width(), 4);
        assert_eq!(sim.resolution_length(), Ok(2));

        let mut campaign = Campaign::new(sim);
        let runs = campaign.compare_generators(&standard_generators(0x1234_5678_9abc)).unwrap();
        assert_eq!(runs.len(), 5);
        assert!(runs.iter().all(|r| r.result.coverage() > 0.0));

        let exhaustive: Vec<_> = (0..16).map(|n| TestVector::from_bits(n, 4)).collect();
        let result = campaign.run_all(&exhaustive, CoverageMode::Dropping).unwrap();
        assert!(result.remaining.is_empty(), "{:?}", result.report(campaign.detector().graph()).remaining);
    }

    #[test]
    fn feedback_is_unbounded() {
        let netlist = Netlist::new()
            .input("a")
            .output("q")
            .gate("n", "NOR", &["a", "q"])
            .gate("q", "DFF", &["n"]);
        let graph = CircuitGraph::compile(&netlist).unwrap();
        assert_eq!(graph.resolution_length(), Err(UnboundedResolution { flip_flop: "q".into() }));
    }

    #[test]
    fn combinational_cycle() {
        let netlist = Netlist::new()
            .input("a")
            .output("y")
            .gate("x", "NAND", &["a", "y"])
            .gate("y", "NAND", &["x", "a"]);
        assert!(matches!(
            CircuitGraph::compile(&netlist),
            Err(StructuralError::CombinationalCycle { .. })
        ));
    }
}
