//! Test vectors.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Errors which can occur when building a [`TestVector`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VectorError {
    /// A test vector may only hold `0` and `1`.
    #[error("invalid test vector bit {found:?} at position {index}")]
    InvalidBit {
        /// Position of the bad bit.
        index: usize,
        /// What was found there.
        found: String,
    },
    /// The vector does not have the width the circuit expects.
    #[error("expected a test vector of width {expected}, found width {found}")]
    Width {
        /// Expected width.
        expected: usize,
        /// Actual width.
        found: usize,
    },
}

/// A fixed-length sequence of `0` and `1` values.
///
/// For combinational circuits the bits are applied to the primary inputs in order.
/// For scan circuits the primary inputs come first, followed by the flip-flops.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TestVector(Box<[Value]>);

impl TestVector {
    /// Creates a test vector, checking that every value is `0` or `1`.
    pub fn new(values: impl IntoIterator<Item = Value>) -> Result<Self, VectorError> {
        values.into_iter()
            .enumerate()
            .map(|(index, v)| match v {
                Value::Zero | Value::One => Ok(v),
                v => Err(VectorError::InvalidBit { index, found: v.to_string() }),
            })
            .collect::<Result<_, _>>()
            .map(TestVector)
    }

    /// Creates a test vector from the lowest `width` bits of `bits` (most significant first).
    ///
    /// Positions above bit 63 are `0`.
    pub fn from_bits(bits: u64, width: usize) -> Self {
        (0..width).rev()
            .map(|i| i < 64 && (bits >> i) & 1 == 1)
            .collect()
    }

    /// The number of bits.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector has no bits.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The bits as values.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Iterates over the bits as values.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.0.iter().copied()
    }

    /// A copy of the bits in `range`.
    pub fn slice(&self, range: Range<usize>) -> Self {
        TestVector(self.0[range].into())
    }

    /// A copy of the first `width` bits (or the whole vector if it is shorter).
    pub fn truncated(&self, width: usize) -> Self {
        self.slice(0..width.min(self.len()))
    }

    /// Checks the vector has the given width.
    pub fn expect_width(&self, expected: usize) -> Result<(), VectorError> {
        match self.len() == expected {
            true  => Ok(()),
            false => Err(VectorError::Width { expected, found: self.len() }),
        }
    }
}

impl FromIterator<bool> for TestVector {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        TestVector(iter.into_iter().map(Value::from).collect())
    }
}

impl FromStr for TestVector {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .enumerate()
            .map(|(index, c)| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                c => Err(VectorError::InvalidBit { index, found: c.to_string() }),
            })
            .collect()
    }
}
impl TryFrom<String> for TestVector {
    type Error = VectorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
impl From<TestVector> for String {
    fn from(value: TestVector) -> Self {
        value.to_string()
    }
}
impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|v| write!(f, "{v}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let v: TestVector = "0110".parse().unwrap();
        assert_eq!(v.values(), [Value::Zero, Value::One, Value::One, Value::Zero]);
        assert_eq!(v.to_string(), "0110");
        assert_eq!(
            "01U".parse::<TestVector>(),
            Err(VectorError::InvalidBit { index: 2, found: "U".into() })
        );
        assert_eq!("".parse::<TestVector>(), Ok(TestVector::default()));
    }

    #[test]
    fn only_binary_values() {
        assert!(TestVector::new([Value::One, Value::Zero]).is_ok());
        assert!(TestVector::new([Value::One, Value::D]).is_err());
    }

    #[test]
    fn from_bits() {
        assert_eq!(TestVector::from_bits(0b101, 3).to_string(), "101");
        assert_eq!(TestVector::from_bits(0b101, 5).to_string(), "00101");
        assert_eq!(TestVector::from_bits(0b101, 2).to_string(), "01");
        assert_eq!(TestVector::from_bits(u64::MAX, 66).to_string(), format!("00{}", "1".repeat(64)));
    }

    #[test]
    fn slicing() {
        let v: TestVector = "110010".parse().unwrap();
        assert_eq!(v.truncated(3).to_string(), "110");
        assert_eq!(v.truncated(10), v);
        assert_eq!(v.slice(2..5).to_string(), "001");
        assert!(v.expect_width(6).is_ok());
        assert_eq!(v.expect_width(4), Err(VectorError::Width { expected: 4, found: 6 }));
    }

    #[test]
    fn serde_as_string() {
        let v: TestVector = "1001".parse().unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"1001\"");
        assert_eq!(serde_json::from_str::<TestVector>(&json).unwrap(), v);
        assert!(serde_json::from_str::<TestVector>("\"10x\"").is_err());
    }
}
