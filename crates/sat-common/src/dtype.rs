//! Pixel data types for assembled rasters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage type of dataset samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    UInt8,
    UInt16,
    Int16,
    Float32,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::Float32 => "float32",
        }
    }

    /// Bytes per sample.
    pub fn size(&self) -> usize {
        match self {
            DataType::UInt8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::Float32 => 4,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32)
    }

    /// Whether `value` can be stored in this type without loss.
    pub fn can_represent(&self, value: f64) -> bool {
        match self {
            DataType::UInt8 => value.fract() == 0.0 && (0.0..=255.0).contains(&value),
            DataType::UInt16 => value.fract() == 0.0 && (0.0..=65535.0).contains(&value),
            DataType::Int16 => value.fract() == 0.0 && (-32768.0..=32767.0).contains(&value),
            DataType::Float32 => value.is_nan() || value.abs() <= f32::MAX as f64,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uint8" | "u8" => Ok(DataType::UInt8),
            "uint16" | "u16" => Ok(DataType::UInt16),
            "int16" | "i16" => Ok(DataType::Int16),
            "float32" | "f32" => Ok(DataType::Float32),
            other => Err(format!("unsupported dtype '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dtype() {
        assert_eq!("uint16".parse::<DataType>().unwrap(), DataType::UInt16);
        assert_eq!("Float32".parse::<DataType>().unwrap(), DataType::Float32);
        assert!("complex64".parse::<DataType>().is_err());
    }

    #[test]
    fn test_can_represent() {
        assert!(DataType::UInt16.can_represent(0.0));
        assert!(!DataType::UInt16.can_represent(-1.0));
        assert!(DataType::Int16.can_represent(-32768.0));
        assert!(!DataType::UInt8.can_represent(0.5));
        assert!(DataType::Float32.can_represent(-32767.0));
    }
}
