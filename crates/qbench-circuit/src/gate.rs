//! Gate types for encoding circuits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CircuitError;

/// Prefix of symbolic parameter references (`input_0`, `input_1`, ...).
pub const INPUT_PREFIX: &str = "input_";

/// Largest accepted absolute value of a numeric rotation angle.
pub const MAX_ANGLE: f64 = std::f64::consts::TAU;

/// Gate kinds accepted in an encoding circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateKind {
    /// Hadamard gate.
    H,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,
    /// Rotation around X.
    Rx,
    /// Rotation around Y.
    Ry,
    /// Rotation around Z.
    Rz,
    /// Controlled-NOT gate.
    Cnot,
    /// Controlled-Z gate.
    Cz,
    /// SWAP gate.
    Swap,
    /// Measurement, only allowed as the final gate.
    Measure,
}

impl GateKind {
    /// All supported kinds.
    pub const ALL: [GateKind; 11] = [
        GateKind::H,
        GateKind::X,
        GateKind::Y,
        GateKind::Z,
        GateKind::Rx,
        GateKind::Ry,
        GateKind::Rz,
        GateKind::Cnot,
        GateKind::Cz,
        GateKind::Swap,
        GateKind::Measure,
    ];

    /// Get the wire-format name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            GateKind::H => "H",
            GateKind::X => "X",
            GateKind::Y => "Y",
            GateKind::Z => "Z",
            GateKind::Rx => "RX",
            GateKind::Ry => "RY",
            GateKind::Rz => "RZ",
            GateKind::Cnot => "CNOT",
            GateKind::Cz => "CZ",
            GateKind::Swap => "SWAP",
            GateKind::Measure => "MEASURE",
        }
    }

    /// Whether this kind requires a non-empty `params` list.
    #[inline]
    pub fn is_parameterized(&self) -> bool {
        matches!(self, GateKind::Rx | GateKind::Ry | GateKind::Rz)
    }

    /// Whether this kind may carry `control` qubits.
    #[inline]
    pub fn is_controlled(&self) -> bool {
        matches!(self, GateKind::Cnot | GateKind::Cz)
    }

    /// Whether this kind is a measurement.
    #[inline]
    pub fn is_measurement(&self) -> bool {
        matches!(self, GateKind::Measure)
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GateKind {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| CircuitError::UnsupportedGate(s.to_string()))
    }
}

/// Parse an `input_<k>` reference into its feature index.
///
/// Returns `None` for anything that is not the prefix followed by one or
/// more ASCII digits.
pub fn parse_input_ref(s: &str) -> Option<u32> {
    let digits = s.strip_prefix(INPUT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A gate parameter: a fixed angle or a reference to a classical input feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawParam", into = "RawParam")]
pub enum Param {
    /// Fixed rotation angle in radians.
    Angle(f64),
    /// Reference to input feature `k` (`input_<k>`).
    Input(u32),
}

impl Param {
    /// Feature index if this is an input reference.
    pub fn input_index(&self) -> Option<u32> {
        match self {
            Param::Input(k) => Some(*k),
            Param::Angle(_) => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Angle(v) => write!(f, "{v}"),
            Param::Input(k) => write!(f, "{INPUT_PREFIX}{k}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawParam {
    Number(f64),
    Text(String),
}

impl TryFrom<RawParam> for Param {
    type Error = CircuitError;

    fn try_from(raw: RawParam) -> Result<Self, Self::Error> {
        match raw {
            RawParam::Number(v) => Ok(Param::Angle(v)),
            RawParam::Text(s) => parse_input_ref(&s)
                .map(Param::Input)
                .ok_or(CircuitError::UnknownParameter(s)),
        }
    }
}

impl From<Param> for RawParam {
    fn from(param: Param) -> Self {
        match param {
            Param::Angle(v) => RawParam::Number(v),
            Param::Input(k) => RawParam::Text(format!("{INPUT_PREFIX}{k}")),
        }
    }
}

/// One operation of an encoding circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Gate kind.
    pub gate: GateKind,
    /// Target qubits.
    pub wires: Vec<u32>,
    /// Rotation parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
    /// Control qubits, for controlled kinds only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Vec<u32>>,
}

impl Gate {
    /// Create a gate without parameters or controls.
    pub fn new(gate: GateKind, wires: impl Into<Vec<u32>>) -> Self {
        Self {
            gate,
            wires: wires.into(),
            params: vec![],
            control: None,
        }
    }

    /// Set the rotation parameters.
    pub fn with_params(mut self, params: impl Into<Vec<Param>>) -> Self {
        self.params = params.into();
        self
    }

    /// Set the control qubits.
    pub fn with_control(mut self, control: impl Into<Vec<u32>>) -> Self {
        self.control = Some(control.into());
        self
    }

    /// Every qubit this gate touches, targets first.
    pub fn qubits(&self) -> impl Iterator<Item = u32> + '_ {
        self.wires
            .iter()
            .chain(self.control.iter().flatten())
            .copied()
    }
}
