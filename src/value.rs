//! Value kinds and the plain value types a datum can carry.

use std::fmt;
use std::str::FromStr;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The closed set of kinds a [`Datum`](crate::Datum) can hold.
///
/// A datum starts as `Unset` and is fixed to one of the other kinds on first
/// use; the kind can never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    /// No kind assigned yet. Only valid before first use.
    Unset = 0,
    /// 32-bit signed integer.
    Integer,
    /// 32-bit float.
    Float,
    /// Owned UTF-8 string.
    String,
    /// Four-component float vector.
    Vector4,
    /// 4x4 float matrix.
    Matrix4,
    /// Nested child scopes (non-owning handles into the scope heap).
    Table,
    /// Opaque polymorphic node handle.
    Pointer,
}

impl ValueKind {
    /// Human-readable name, also the key used by [`ValueKind::from_name`].
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Unset => "unset",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Vector4 => "vector",
            ValueKind::Matrix4 => "matrix",
            ValueKind::Table => "table",
            ValueKind::Pointer => "pointer",
        }
    }

    /// Look up a kind from its textual name.
    ///
    /// `Unset` and `Pointer` are deliberately absent: deserializers may only
    /// name kinds that can be expressed as data.
    pub fn from_name(name: &str) -> Option<ValueKind> {
        match name {
            "integer" => Some(ValueKind::Integer),
            "float" => Some(ValueKind::Float),
            "string" => Some(ValueKind::String),
            "vector" => Some(ValueKind::Vector4),
            "matrix" => Some(ValueKind::Matrix4),
            "table" => Some(ValueKind::Table),
            _ => None,
        }
    }

    /// True for the kinds whose elements are handles to scope nodes.
    pub fn is_node_kind(self) -> bool {
        matches!(self, ValueKind::Table | ValueKind::Pointer)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a value type cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    kind: &'static str,
}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} literal", self.kind)
    }
}

impl std::error::Error for ParseValueError {}

/// Four-component float vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vector4 {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Bit-exact comparison. Distinguishes `0.0` from `-0.0` and treats two
    /// NaNs with the same payload as equal, matching datum equality semantics.
    pub fn bits_eq(&self, other: &Vector4) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.z.to_bits() == other.z.to_bits()
            && self.w.to_bits() == other.w.to_bits()
    }
}

impl fmt::Display for Vector4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }
}

impl FromStr for Vector4 {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = parse_floats(s, 4, "vector")?;
        Ok(Vector4::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

/// Column-major 4x4 float matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix4 {
    pub cols: [[f32; 4]; 4],
}

impl Matrix4 {
    pub const IDENTITY: Matrix4 = Matrix4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Bit-exact comparison, see [`Vector4::bits_eq`].
    pub fn bits_eq(&self, other: &Matrix4) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl fmt::Display for Matrix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut values = self.cols.iter().flatten();
        write!(f, "(")?;
        if let Some(first) = values.next() {
            write!(f, "{first}")?;
        }
        for v in values {
            write!(f, ", {v}")?;
        }
        write!(f, ")")
    }
}

impl FromStr for Matrix4 {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = parse_floats(s, 16, "matrix")?;
        let mut cols = [[0.0f32; 4]; 4];
        for (i, value) in parts.iter().enumerate() {
            cols[i / 4][i % 4] = *value;
        }
        Ok(Matrix4::from_cols(cols))
    }
}

fn parse_floats(s: &str, expected: usize, kind: &'static str) -> Result<Vec<f32>, ParseValueError> {
    let cleaned: String = s.replace(['(', ')'], " ");
    let parts: Result<Vec<f32>, _> = cleaned
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect();
    match parts {
        Ok(values) if values.len() == expected => Ok(values),
        _ => Err(ParseValueError { kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip() {
        for kind in [
            ValueKind::Integer,
            ValueKind::Float,
            ValueKind::String,
            ValueKind::Vector4,
            ValueKind::Matrix4,
            ValueKind::Table,
        ] {
            assert_eq!(ValueKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ValueKind::from_name("unset"), None);
        assert_eq!(ValueKind::from_name("pointer"), None);
        assert_eq!(ValueKind::from_name("bogus"), None);
    }

    #[test]
    fn kind_repr_conversions() {
        let raw: u8 = ValueKind::Table.into();
        assert_eq!(ValueKind::try_from(raw), Ok(ValueKind::Table));
        assert!(ValueKind::try_from(200u8).is_err());
    }

    #[test]
    fn node_kinds() {
        assert!(ValueKind::Table.is_node_kind());
        assert!(ValueKind::Pointer.is_node_kind());
        assert!(!ValueKind::String.is_node_kind());
    }

    #[test]
    fn vector_parse_and_display() {
        let v: Vector4 = "(1, 2.5, -3, 0)".parse().unwrap();
        assert_eq!(v, Vector4::new(1.0, 2.5, -3.0, 0.0));
        let round: Vector4 = v.to_string().parse().unwrap();
        assert_eq!(round, v);

        assert!("(1, 2, 3)".parse::<Vector4>().is_err());
        assert!("(a, b, c, d)".parse::<Vector4>().is_err());
    }

    #[test]
    fn matrix_parse_and_display() {
        let m = Matrix4::IDENTITY;
        let round: Matrix4 = m.to_string().parse().unwrap();
        assert_eq!(round, m);
        assert!("(1, 2)".parse::<Matrix4>().is_err());
    }

    #[test]
    fn bitwise_equality_semantics() {
        let nan = Vector4::new(f32::NAN, 0.0, 0.0, 0.0);
        assert!(nan.bits_eq(&nan));
        assert_ne!(nan, nan); // PartialEq keeps IEEE semantics

        let pos = Vector4::new(0.0, 0.0, 0.0, 0.0);
        let neg = Vector4::new(-0.0, 0.0, 0.0, 0.0);
        assert_eq!(pos, neg);
        assert!(!pos.bits_eq(&neg));
    }
}
