//! The five-valued logic used during fault simulation.
//!
//! A [`Value`] encodes the good machine and the faulty machine at once:
//! - `0` and `1` are equal in both machines,
//! - `D` is 1 in the good machine and 0 in the faulty one,
//! - `D'` is 0 in the good machine and 1 in the faulty one,
//! - `U` is unknown.

use serde::{Deserialize, Serialize};

/// A simulation value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Value {
    /// Logic low in both machines.
    #[serde(rename = "0")]
    Zero,
    /// Logic high in both machines.
    #[serde(rename = "1")]
    One,
    /// Unknown or uninitialized.
    #[default]
    #[serde(rename = "U")]
    Unknown,
    /// Good machine 1, faulty machine 0.
    #[serde(rename = "D")]
    D,
    /// Good machine 0, faulty machine 1.
    #[serde(rename = "D'")]
    DBar,
}

/// All five values, in a fixed order.
pub const ALL_VALUES: [Value; 5] = [Value::Zero, Value::One, Value::Unknown, Value::D, Value::DBar];

impl Value {
    /// Builds a value from its good and faulty machine bits.
    pub const fn from_machines(good: bool, faulty: bool) -> Self {
        match (good, faulty) {
            (false, false) => Value::Zero,
            (true, true)   => Value::One,
            (true, false)  => Value::D,
            (false, true)  => Value::DBar,
        }
    }

    /// The good and faulty machine bits (`None` if unknown).
    pub const fn machines(self) -> Option<(bool, bool)> {
        match self {
            Value::Zero    => Some((false, false)),
            Value::One     => Some((true, true)),
            Value::D       => Some((true, false)),
            Value::DBar    => Some((false, true)),
            Value::Unknown => None,
        }
    }

    /// The value of the fault-free machine.
    pub fn good(self) -> Option<bool> {
        self.machines().map(|(good, _)| good)
    }

    /// Whether this value shows a fault effect (`D` or `D'`).
    pub const fn is_fault(self) -> bool {
        matches!(self, Value::D | Value::DBar)
    }

    /// Whether this is a known value (anything but `U`).
    pub const fn is_known(self) -> bool {
        !matches!(self, Value::Unknown)
    }

    /// Composes this value with a stuck-at fault.
    ///
    /// The faulty machine is forced to the stuck polarity while the good machine keeps its bit.
    ///
    /// ```
    /// use faultsim_engine::value::Value;
    /// use faultsim_engine::fault::StuckAt;
    ///
    /// assert_eq!(Value::One.stuck(StuckAt::Zero), Value::D);
    /// assert_eq!(Value::Zero.stuck(StuckAt::One), Value::DBar);
    /// assert_eq!(Value::Zero.stuck(StuckAt::Zero), Value::Zero);
    /// ```
    pub fn stuck(self, polarity: crate::fault::StuckAt) -> Self {
        match self.good() {
            Some(good) => Value::from_machines(good, polarity.bit()),
            None => Value::Unknown,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        match value {
            true => Value::One,
            false => Value::Zero,
        }
    }
}

/// Error raised when a character or string is not a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot be turned into a value: {0:?}")]
pub struct InvalidValue(pub String);

impl TryFrom<char> for Value {
    type Error = InvalidValue;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        match value {
            '0' => Ok(Value::Zero),
            '1' => Ok(Value::One),
            'U' | 'u' => Ok(Value::Unknown),
            'D' | 'd' => Ok(Value::D),
            c => Err(InvalidValue(c.to_string())),
        }
    }
}
impl std::str::FromStr for Value {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "D'" | "d'" => Ok(Value::DBar),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Value::try_from(c),
                    _ => Err(InvalidValue(s.to_string())),
                }
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Value::Zero    => "0",
            Value::One     => "1",
            Value::Unknown => "U",
            Value::D       => "D",
            Value::DBar    => "D'",
        })
    }
}

impl std::ops::Not for Value {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Value::Zero    => Value::One,
            Value::One     => Value::Zero,
            Value::D       => Value::DBar,
            Value::DBar    => Value::D,
            Value::Unknown => Value::Unknown,
        }
    }
}
