//! Defines core types in the data model

use bytes::Bytes;

use crate::constants::MAX_STRING_LEN;

pub mod accessory;
pub mod characteristic;
pub mod handler;
pub mod profile;
pub mod service;

/// Value formats (HAP 6.3.3, table 6-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Bool,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int,
    Float,
    String,
    Tlv8,
}

impl Format {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Format::Bool => "bool",
            Format::UInt8 => "uint8",
            Format::UInt16 => "uint16",
            Format::UInt32 => "uint32",
            Format::UInt64 => "uint64",
            Format::Int => "int",
            Format::Float => "float",
            Format::String => "string",
            Format::Tlv8 => "tlv8",
        }
    }

    /// The value a characteristic of this format starts with when none is declared
    pub fn zero(&self) -> Value {
        match self {
            Format::Bool => Value::Bool(false),
            Format::UInt8 => Value::UInt8(0),
            Format::UInt16 => Value::UInt16(0),
            Format::UInt32 => Value::UInt32(0),
            Format::UInt64 => Value::UInt64(0),
            Format::Int => Value::Int(0),
            Format::Float => Value::Float(0.0),
            Format::String => Value::String(String::new()),
            Format::Tlv8 => Value::Tlv8(Bytes::new()),
        }
    }
}

/// A characteristic value. The variant always matches the characteristic's [`Format`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int(i32),
    Float(f32),
    String(String),
    Tlv8(Bytes),
}

impl Value {
    pub fn format(&self) -> Format {
        match self {
            Value::Bool(_) => Format::Bool,
            Value::UInt8(_) => Format::UInt8,
            Value::UInt16(_) => Format::UInt16,
            Value::UInt32(_) => Format::UInt32,
            Value::UInt64(_) => Format::UInt64,
            Value::Int(_) => Format::Int,
            Value::Float(_) => Format::Float,
            Value::String(_) => Format::String,
            Value::Tlv8(_) => Format::Tlv8,
        }
    }

    /// Numeric view used for range checks. `None` for strings and tlv8.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(v) => Some(*v as u8 as f64),
            Value::UInt8(v) => Some(*v as f64),
            Value::UInt16(v) => Some(*v as f64),
            Value::UInt32(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::String(_) | Value::Tlv8(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::UInt8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::UInt8(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::UInt16(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::UInt32(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt64(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Tlv8(value)
    }
}

bitflags::bitflags! {
    /// Characteristic permissions (HAP 6.3.3, table 6-4)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u8 {
        /// Paired read, `pr`
        const READ = 0b0000_0001;
        /// Paired write, `pw`
        const WRITE = 0b0000_0010;
        /// Event notifications, `ev`
        const NOTIFY = 0b0000_0100;
    }
}

impl Permissions {
    /// The short names used in the accessory database
    pub fn hap_names(&self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(3);
        if self.contains(Permissions::READ) {
            names.push("pr");
        }
        if self.contains(Permissions::WRITE) {
            names.push("pw");
        }
        if self.contains(Permissions::NOTIFY) {
            names.push("ev");
        }
        names
    }
}

/// Units (HAP 6.3.3, table 6-6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Celsius,
    Percentage,
    ArcDegrees,
    Lux,
    Seconds,
}

impl Unit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Unit::Celsius => "celsius",
            Unit::Percentage => "percentage",
            Unit::ArcDegrees => "arcdegrees",
            Unit::Lux => "lux",
            Unit::Seconds => "seconds",
        }
    }
}

/// Value constraints of a characteristic
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Constraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    /// Only meaningful for strings
    pub max_len: Option<usize>,
}

impl Constraints {
    pub const NONE: Constraints = Constraints {
        min: None,
        max: None,
        step: None,
        max_len: None,
    };

    pub const fn range(min: f64, max: f64, step: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            step: Some(step),
            max_len: None,
        }
    }

    /// Strings never exceed [`MAX_STRING_LEN`]
    pub const fn string(max_len: usize) -> Self {
        Self {
            min: None,
            max: None,
            step: None,
            max_len: Some(if max_len > MAX_STRING_LEN {
                MAX_STRING_LEN
            } else {
                max_len
            }),
        }
    }

    /// Whether `value` lies inside the declared bounds
    pub fn admits(&self, value: &Value) -> bool {
        if let Value::String(s) = value {
            return self.max_len.map_or(true, |max| s.chars().count() <= max);
        }
        let Some(v) = value.as_f64() else {
            return true;
        };
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_format_matches_variant() {
        assert_eq!(Value::from(3u8).format(), Format::UInt8);
        assert_eq!(Value::from(-45).format(), Format::Int);
        assert_eq!(Value::from("blind").format(), Format::String);
        assert_eq!(Format::Float.zero(), Value::Float(0.0));
    }

    #[test]
    fn constraints_bound_numbers_and_strings() {
        let percent = Constraints::range(0.0, 100.0, 1.0);
        assert!(percent.admits(&Value::UInt8(100)));
        assert!(!percent.admits(&Value::UInt8(150)));

        let tilt = Constraints::range(-90.0, 90.0, 1.0);
        assert!(tilt.admits(&Value::Int(-90)));
        assert!(!tilt.admits(&Value::Int(-91)));

        let name = Constraints::string(4);
        assert!(name.admits(&Value::from("abcd")));
        assert!(!name.admits(&Value::from("abcde")));
        assert_eq!(Constraints::string(1000).max_len, Some(MAX_STRING_LEN));
    }

    #[test]
    fn permission_names() {
        let perms = Permissions::READ | Permissions::NOTIFY;
        assert_eq!(perms.hap_names(), vec!["pr", "ev"]);
    }
}
