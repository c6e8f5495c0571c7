//! Fault coverage campaigns.
//!
//! A [`Campaign`] applies a sequence of test vectors to a [`FaultDetector`] and records,
//! for every vector, which faults it detected and which faults no vector detected.
//!
//! Results are memoized per vector in a [`CoverageCache`], so applying a vector that was
//! already simulated only simulates the faults it was never tried against.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::circuit::{CircuitGraph, SimError};
use crate::config::{GeneratorConfig, SimConfig};
use crate::fault::Fault;
use crate::generator::TestVectorGenerator;
use crate::sim::FaultDetector;
use crate::vector::TestVector;

/// Whether detected faults keep being simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageMode {
    /// Every vector is simulated against every fault.
    Full,
    /// A detected fault is dropped from later vectors.
    Dropping,
}

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    tested: HashSet<Fault>,
    detected: HashSet<Fault>,
}

/// Per-vector memo of which faults were tried and which were detected.
#[derive(Debug, Clone, Default)]
pub struct CoverageCache {
    entries: HashMap<TestVector, CacheEntry>,
}
impl CoverageCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Default::default()
    }

    /// The number of vectors in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `fault` was already simulated with `vector`.
    pub fn is_tested(&self, vector: &TestVector, fault: &Fault) -> bool {
        self.entries.get(vector).is_some_and(|e| e.tested.contains(fault))
    }

    /// The faults of `candidates` which `vector` detects (in order),
    /// simulating only those not tried with `vector` before.
    fn detect<D: FaultDetector>(&mut self, detector: &mut D, vector: &TestVector, candidates: &[Fault]) -> Result<Vec<Fault>, SimError> {
        let entry = self.entries.entry(vector.clone()).or_default();
        let untested: Vec<_> = candidates.iter()
            .copied()
            .filter(|f| !entry.tested.contains(f))
            .collect();

        if !untested.is_empty() {
            let detected = detector.detect(vector, &untested)?;
            entry.tested.extend(untested);
            entry.detected.extend(detected);
        } else {
            tracing::trace!(%vector, "answered from coverage cache");
        }

        Ok(candidates.iter().copied().filter(|f| entry.detected.contains(f)).collect())
    }
}

/// The outcome of a campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignResult {
    /// The number of faults the campaign started with.
    pub total: usize,
    /// The faults no vector detected, in their original order.
    pub remaining: IndexSet<Fault>,
    /// Each applied vector with the faults it detected, in application order.
    ///
    /// In [`CoverageMode::Dropping`] a fault is only listed for the first vector detecting it.
    pub per_vector: Vec<(TestVector, Vec<Fault>)>,
}
impl CampaignResult {
    /// The fraction of faults detected (`1.0` if there were no faults).
    pub fn coverage(&self) -> f64 {
        match self.total {
            0 => 1.0,
            n => (n - self.remaining.len()) as f64 / n as f64,
        }
    }

    /// Every fault detected by some vector.
    pub fn detected(&self) -> IndexSet<Fault> {
        self.per_vector.iter()
            .flat_map(|(_, faults)| faults.iter().copied())
            .collect()
    }

    /// A serializable summary with faults written out by name.
    pub fn report(&self, graph: &CircuitGraph) -> CampaignReport {
        let name = |f: &Fault| f.display(graph).to_string();
        CampaignReport {
            total: self.total,
            detected: self.total - self.remaining.len(),
            coverage: self.coverage(),
            remaining: self.remaining.iter().map(name).collect(),
            vectors: self.per_vector.iter()
                .map(|(vector, faults)| VectorReport {
                    vector: vector.clone(),
                    detected: faults.iter().map(name).collect(),
                })
                .collect(),
        }
    }
}

/// A serializable campaign summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignReport {
    /// The number of faults considered.
    pub total: usize,
    /// The number of faults detected.
    pub detected: usize,
    /// The fraction of faults detected.
    pub coverage: f64,
    /// The undetected faults.
    pub remaining: Vec<String>,
    /// The applied vectors.
    pub vectors: Vec<VectorReport>,
}

/// The faults detected by one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorReport {
    /// The vector.
    pub vector: TestVector,
    /// The faults it detected.
    pub detected: Vec<String>,
}

/// The result of running one generator setup.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorRun {
    /// The generator setup.
    pub config: GeneratorConfig,
    /// The campaign it produced.
    pub result: CampaignResult,
}

/// A fault coverage campaign over a [`FaultDetector`].
#[derive(Debug, Clone)]
pub struct Campaign<D> {
    detector: D,
    cache: CoverageCache,
    vector_cap: usize,
}

impl<D: FaultDetector> Campaign<D> {
    /// Creates a campaign with an empty cache and the default settings.
    pub fn new(detector: D) -> Self {
        Self::from_config(detector, &SimConfig::default())
    }

    /// Creates a campaign with an empty cache, taking its vector cap from `config`.
    pub fn from_config(detector: D, config: &SimConfig) -> Self {
        Self { detector, cache: CoverageCache::new(), vector_cap: config.vector_cap }
    }

    /// Sets the largest number of vectors generated by [`Campaign::run_batch`].
    pub fn with_vector_cap(mut self, vector_cap: usize) -> Self {
        self.vector_cap = vector_cap;
        self
    }

    /// The detector being driven.
    pub fn detector(&self) -> &D {
        &self.detector
    }
    /// The detector being driven.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }
    /// The coverage cache.
    pub fn cache(&self) -> &CoverageCache {
        &self.cache
    }

    /// Applies `vectors` in order against `faults`.
    pub fn run(&mut self, vectors: &[TestVector], faults: &IndexSet<Fault>, mode: CoverageMode) -> Result<CampaignResult, SimError> {
        let all: Vec<Fault> = faults.iter().copied().collect();
        let mut remaining = faults.clone();
        let mut per_vector = Vec::with_capacity(vectors.len());

        for vector in vectors {
            let detected = match mode {
                CoverageMode::Full => self.cache.detect(&mut self.detector, vector, &all)?,
                CoverageMode::Dropping => {
                    let active: Vec<Fault> = remaining.iter().copied().collect();
                    self.cache.detect(&mut self.detector, vector, &active)?
                },
            };
            if !detected.is_empty() {
                let hit: HashSet<_> = detected.iter().collect();
                remaining.retain(|f| !hit.contains(f));
            }
            per_vector.push((vector.clone(), detected));
        }

        let result = CampaignResult { total: faults.len(), remaining, per_vector };
        tracing::info!(
            ?mode,
            vectors = vectors.len(),
            detected = result.total - result.remaining.len(),
            remaining = result.remaining.len(),
            coverage = result.coverage(),
            "campaign finished"
        );
        Ok(result)
    }

    /// Applies `vectors` against every fault of the circuit.
    pub fn run_all(&mut self, vectors: &[TestVector], mode: CoverageMode) -> Result<CampaignResult, SimError> {
        let faults = self.detector.fault_universe();
        self.run(vectors, &faults, mode)
    }

    /// Runs a full campaign and a fault-dropping campaign over the same vectors.
    pub fn run_both(&mut self, vectors: &[TestVector], faults: &IndexSet<Fault>) -> Result<(CampaignResult, CampaignResult), SimError> {
        let full = self.run(vectors, faults, CoverageMode::Full)?;
        let dropping = self.run(vectors, faults, CoverageMode::Dropping)?;
        Ok((full, dropping))
    }

    /// Generates vectors from a generator setup and runs a fault-dropping campaign
    /// against every fault of the circuit.
    pub fn run_batch(&mut self, config: &GeneratorConfig) -> Result<CampaignResult, SimError> {
        let vectors = TestVectorGenerator::from_config(config, self.detector.vector_width(), self.vector_cap).generate();
        tracing::debug!(generator = %config.name, vectors = vectors.len(), "generated test vectors");
        self.run_all(&vectors, CoverageMode::Dropping)
    }
}

impl<D: FaultDetector + Clone + Send + Sync> Campaign<D> {
    /// Runs [`Campaign::run_batch`] for every generator setup in parallel.
    ///
    /// Each setup runs on its own copy of this campaign. Results are in the order of `configs`.
    pub fn compare_generators(&self, configs: &[GeneratorConfig]) -> Result<Vec<GeneratorRun>, SimError> {
        let runs: Vec<GeneratorRun> = configs.par_iter()
            .map(|config| {
                let mut worker = self.clone();
                let result = worker.run_batch(config)?;
                Ok(GeneratorRun { config: config.clone(), result })
            })
            .collect::<Result<_, SimError>>()?;

        for run in &runs {
            tracing::info!(
                generator = %run.config.name,
                vectors = run.result.per_vector.len(),
                coverage = run.result.coverage(),
                "generator compared"
            );
        }
        Ok(runs)
    }
}
