//! Test vector generation.
//!
//! ## LFSR-based generation
//!
//! A seed is padded to a whole number of bytes (at least as many bits as the circuit has inputs)
//! and split into bytes, most significant first. Each byte seeds its own 8-bit Galois [`Lfsr`].
//! Every step advances all registers at once, and the concatenation of their states
//! (truncated to the input width) is the next vector:
//!
//! ```text
//!   seed 0x12_34  ──▶  ┌──────┐ ┌──────┐
//!                      │ 0x12 │ │ 0x34 │  step ──▶  0x24 0x68  ──▶  "0010010001101000"[..width]
//!                      └──────┘ └──────┘
//! ```
//!
//! Repeated vectors are skipped, and generation stops once the combined register state
//! repeats or enough vectors were produced.
//!
//! ## Counter-based generation
//!
//! [`Counter`] takes the top `width` bits of the padded seed as a start value
//! and counts up from it, wrapping around.

use indexmap::IndexSet;

use crate::config::GeneratorConfig;
use crate::vector::TestVector;

/// Rounds a bit count up to a whole number of bytes.
fn bits_ceiling(bits: usize) -> usize {
    bits.div_ceil(8) * 8
}

/// The number of significant bits in `seed`.
fn bit_length(seed: u64) -> usize {
    (u64::BITS - seed.leading_zeros()) as usize
}

/// The number of distinct vectors of a given width, capped at `cap`.
pub fn vector_count(width: usize, cap: usize) -> usize {
    match u32::try_from(width).ok().and_then(|w| 1usize.checked_shl(w)) {
        Some(n) => n.min(cap),
        None => cap,
    }
}

/// An 8-bit Galois linear-feedback shift register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lfsr {
    state: u8,
    feedback: u8,
}
impl Lfsr {
    /// Creates a register from a seed and its tap positions.
    ///
    /// Bit 0 of the feedback mask is always set. Taps outside `1..=7` are ignored.
    pub fn new(seed: u8, taps: &[u32]) -> Self {
        let feedback = taps.iter()
            .filter(|&&t| (1..8).contains(&t))
            .fold(1u8, |mask, &t| mask | (1 << t));
        Self { state: seed, feedback }
    }

    /// The current register contents.
    pub fn state(&self) -> u8 {
        self.state
    }

    /// The feedback mask applied when the most significant bit shifts out.
    pub fn feedback(&self) -> u8 {
        self.feedback
    }

    /// Advances the register once and returns its new state.
    pub fn step(&mut self) -> u8 {
        let msb = self.state & 0x80 != 0;
        self.state <<= 1;
        if msb {
            self.state ^= self.feedback;
        }
        self.state
    }
}

/// A chain of [`Lfsr`]s producing distinct test vectors.
#[derive(Debug, Clone)]
pub struct LfsrChain {
    lfsrs: Vec<Lfsr>,
    width: usize,
    remaining: usize,
    seen: IndexSet<TestVector>,
    states: IndexSet<Vec<u8>>,
}
impl LfsrChain {
    /// Creates a chain producing at most `min(cap, 2^width)` vectors of the given width.
    pub fn new(seed: u64, width: usize, taps: &[u32], cap: usize) -> Self {
        let padded = bits_ceiling(width.max(bit_length(seed)));
        let lfsrs = (0..padded / 8)
            .map(|i| {
                let shift = padded - 8 * (i + 1);
                let byte = seed.checked_shr(shift as u32).unwrap_or(0) as u8;
                Lfsr::new(byte, taps)
            })
            .collect();

        Self {
            lfsrs,
            width,
            remaining: vector_count(width, cap),
            seen: IndexSet::new(),
            states: IndexSet::new(),
        }
    }

    /// The registers of the chain, most significant first.
    pub fn lfsrs(&self) -> &[Lfsr] {
        &self.lfsrs
    }
}
impl Iterator for LfsrChain {
    type Item = TestVector;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 0 {
            let state: Vec<u8> = self.lfsrs.iter_mut().map(Lfsr::step).collect();
            let vector = state.iter()
                .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
                .collect::<TestVector>()
                .truncated(self.width);

            if !self.states.insert(state) {
                tracing::warn!(width = self.width, missing = self.remaining, "LFSR sequence repeated before producing every vector");
                self.remaining = 0;
                break;
            }
            if self.seen.insert(vector.clone()) {
                self.remaining -= 1;
                return Some(vector);
            }
        }
        None
    }
}

/// A wrapping counter producing test vectors.
#[derive(Debug, Clone)]
pub struct Counter {
    start: u64,
    index: usize,
    count: usize,
    width: usize,
}
impl Counter {
    /// Creates a counter producing `min(cap, 2^width)` vectors of the given width.
    pub fn new(seed: u64, width: usize, cap: usize) -> Self {
        let padded = bits_ceiling(width.max(bit_length(seed)));
        let start = seed.checked_shr((padded - width) as u32).unwrap_or(0);
        Self { start, index: 0, count: vector_count(width, cap), width }
    }
}
impl Iterator for Counter {
    type Item = TestVector;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let count = self.count as u64;
        let value = (self.start % count + self.index as u64) % count;
        self.index += 1;
        Some(TestVector::from_bits(value, self.width))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.count - self.index;
        (n, Some(n))
    }
}

/// A deterministic source of test vectors.
#[derive(Debug, Clone)]
pub enum TestVectorGenerator {
    /// LFSR chain.
    Lfsr(LfsrChain),
    /// Counter.
    Counter(Counter),
}
impl TestVectorGenerator {
    /// An LFSR chain generator (see [`LfsrChain::new`]).
    pub fn lfsr(seed: u64, width: usize, taps: &[u32], cap: usize) -> Self {
        Self::Lfsr(LfsrChain::new(seed, width, taps, cap))
    }

    /// A counter generator (see [`Counter::new`]).
    pub fn counter(seed: u64, width: usize, cap: usize) -> Self {
        Self::Counter(Counter::new(seed, width, cap))
    }

    /// The generator described by a configuration.
    ///
    /// An empty tap list selects the counter.
    pub fn from_config(config: &GeneratorConfig, width: usize, cap: usize) -> Self {
        match config.taps.is_empty() {
            true  => Self::counter(config.seed, width, cap),
            false => Self::lfsr(config.seed, width, &config.taps, cap),
        }
    }

    /// Collects the whole sequence.
    pub fn generate(self) -> Vec<TestVector> {
        self.collect()
    }
}
impl Iterator for TestVectorGenerator {
    type Item = TestVector;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Lfsr(g) => g.next(),
            Self::Counter(g) => g.next(),
        }
    }
}
