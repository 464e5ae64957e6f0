//! Native per-channel sample encodings reported by the driver.

use std::fmt;

use asio_sys as ffi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Int16Msb,
    Int24Msb,
    Int32Msb,
    Float32Msb,
    Float64Msb,
    Int32Msb16,
    Int32Msb18,
    Int32Msb20,
    Int32Msb24,
    Int16Lsb,
    Int24Lsb,
    Int32Lsb,
    Float32Lsb,
    Float64Lsb,
    Int32Lsb16,
    Int32Lsb18,
    Int32Lsb20,
    Int32Lsb24,
    DsdInt8Lsb1,
    DsdInt8Msb1,
    DsdInt8Ner8,
    /// A tag this host does not know about.
    Unknown(ffi::AsioSampleType),
}

impl SampleType {
    pub fn from_raw(raw: ffi::AsioSampleType) -> Self {
        match raw {
            ffi::ASIOST_INT16_MSB => Self::Int16Msb,
            ffi::ASIOST_INT24_MSB => Self::Int24Msb,
            ffi::ASIOST_INT32_MSB => Self::Int32Msb,
            ffi::ASIOST_FLOAT32_MSB => Self::Float32Msb,
            ffi::ASIOST_FLOAT64_MSB => Self::Float64Msb,
            ffi::ASIOST_INT32_MSB16 => Self::Int32Msb16,
            ffi::ASIOST_INT32_MSB18 => Self::Int32Msb18,
            ffi::ASIOST_INT32_MSB20 => Self::Int32Msb20,
            ffi::ASIOST_INT32_MSB24 => Self::Int32Msb24,
            ffi::ASIOST_INT16_LSB => Self::Int16Lsb,
            ffi::ASIOST_INT24_LSB => Self::Int24Lsb,
            ffi::ASIOST_INT32_LSB => Self::Int32Lsb,
            ffi::ASIOST_FLOAT32_LSB => Self::Float32Lsb,
            ffi::ASIOST_FLOAT64_LSB => Self::Float64Lsb,
            ffi::ASIOST_INT32_LSB16 => Self::Int32Lsb16,
            ffi::ASIOST_INT32_LSB18 => Self::Int32Lsb18,
            ffi::ASIOST_INT32_LSB20 => Self::Int32Lsb20,
            ffi::ASIOST_INT32_LSB24 => Self::Int32Lsb24,
            ffi::ASIOST_DSD_INT8_LSB1 => Self::DsdInt8Lsb1,
            ffi::ASIOST_DSD_INT8_MSB1 => Self::DsdInt8Msb1,
            ffi::ASIOST_DSD_INT8_NER8 => Self::DsdInt8Ner8,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> ffi::AsioSampleType {
        match self {
            Self::Int16Msb => ffi::ASIOST_INT16_MSB,
            Self::Int24Msb => ffi::ASIOST_INT24_MSB,
            Self::Int32Msb => ffi::ASIOST_INT32_MSB,
            Self::Float32Msb => ffi::ASIOST_FLOAT32_MSB,
            Self::Float64Msb => ffi::ASIOST_FLOAT64_MSB,
            Self::Int32Msb16 => ffi::ASIOST_INT32_MSB16,
            Self::Int32Msb18 => ffi::ASIOST_INT32_MSB18,
            Self::Int32Msb20 => ffi::ASIOST_INT32_MSB20,
            Self::Int32Msb24 => ffi::ASIOST_INT32_MSB24,
            Self::Int16Lsb => ffi::ASIOST_INT16_LSB,
            Self::Int24Lsb => ffi::ASIOST_INT24_LSB,
            Self::Int32Lsb => ffi::ASIOST_INT32_LSB,
            Self::Float32Lsb => ffi::ASIOST_FLOAT32_LSB,
            Self::Float64Lsb => ffi::ASIOST_FLOAT64_LSB,
            Self::Int32Lsb16 => ffi::ASIOST_INT32_LSB16,
            Self::Int32Lsb18 => ffi::ASIOST_INT32_LSB18,
            Self::Int32Lsb20 => ffi::ASIOST_INT32_LSB20,
            Self::Int32Lsb24 => ffi::ASIOST_INT32_LSB24,
            Self::DsdInt8Lsb1 => ffi::ASIOST_DSD_INT8_LSB1,
            Self::DsdInt8Msb1 => ffi::ASIOST_DSD_INT8_MSB1,
            Self::DsdInt8Ner8 => ffi::ASIOST_DSD_INT8_NER8,
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether a wave format declaring `bits` per sample can be carried by
    /// this native type.
    ///
    /// 32-bit requests accept every 32-bit integer or float variant in either
    /// byte order, including the packed ones; 24- and 16-bit requests accept
    /// only the matching plain integer types.
    pub fn carries_container_bits(self, bits: u16) -> bool {
        match bits {
            32 => matches!(
                self,
                Self::Int32Msb
                    | Self::Float32Msb
                    | Self::Int32Msb16
                    | Self::Int32Msb18
                    | Self::Int32Msb20
                    | Self::Int32Msb24
                    | Self::Int32Lsb
                    | Self::Float32Lsb
                    | Self::Int32Lsb16
                    | Self::Int32Lsb18
                    | Self::Int32Lsb20
                    | Self::Int32Lsb24
            ),
            24 => matches!(self, Self::Int24Msb | Self::Int24Lsb),
            16 => matches!(self, Self::Int16Msb | Self::Int16Lsb),
            _ => false,
        }
    }

    /// Bytes one sample occupies in a driver buffer, if known.
    pub fn container_bytes(self) -> Option<usize> {
        match self {
            Self::Int16Msb | Self::Int16Lsb => Some(2),
            Self::Int24Msb | Self::Int24Lsb => Some(3),
            Self::Float64Msb | Self::Float64Lsb => Some(8),
            Self::DsdInt8Lsb1 | Self::DsdInt8Msb1 | Self::DsdInt8Ner8 => Some(1),
            Self::Unknown(_) => None,
            _ => Some(4),
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int16Msb => "Int16MSB",
            Self::Int24Msb => "Int24MSB",
            Self::Int32Msb => "Int32MSB",
            Self::Float32Msb => "Float32MSB",
            Self::Float64Msb => "Float64MSB",
            Self::Int32Msb16 => "Int32MSB16",
            Self::Int32Msb18 => "Int32MSB18",
            Self::Int32Msb20 => "Int32MSB20",
            Self::Int32Msb24 => "Int32MSB24",
            Self::Int16Lsb => "Int16LSB",
            Self::Int24Lsb => "Int24LSB",
            Self::Int32Lsb => "Int32LSB",
            Self::Float32Lsb => "Float32LSB",
            Self::Float64Lsb => "Float64LSB",
            Self::Int32Lsb16 => "Int32LSB16",
            Self::Int32Lsb18 => "Int32LSB18",
            Self::Int32Lsb20 => "Int32LSB20",
            Self::Int32Lsb24 => "Int32LSB24",
            Self::DsdInt8Lsb1 => "DSDInt8LSB1",
            Self::DsdInt8Msb1 => "DSDInt8MSB1",
            Self::DsdInt8Ner8 => "DSDInt8NER8",
            Self::Unknown(raw) => return write!(f, "Unknown({raw})"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tags_map_back() {
        for raw in [0, 1, 2, 3, 4, 8, 11, 16, 17, 18, 19, 20, 24, 27, 32, 33, 40] {
            assert_eq!(SampleType::from_raw(raw).raw(), raw);
        }
        assert_eq!(SampleType::from_raw(99), SampleType::Unknown(99));
    }

    #[test]
    fn container_families() {
        assert!(SampleType::Int32Lsb.carries_container_bits(32));
        assert!(SampleType::Float32Msb.carries_container_bits(32));
        assert!(SampleType::Int32Lsb20.carries_container_bits(32));
        assert!(!SampleType::Float64Lsb.carries_container_bits(32));
        assert!(SampleType::Int24Lsb.carries_container_bits(24));
        assert!(!SampleType::Int32Lsb24.carries_container_bits(24));
        assert!(SampleType::Int16Msb.carries_container_bits(16));
        assert!(!SampleType::Int32Lsb.carries_container_bits(16));
        assert!(!SampleType::Int32Lsb.carries_container_bits(8));
    }

    #[test]
    fn container_sizes() {
        assert_eq!(SampleType::Int32Lsb.container_bytes(), Some(4));
        assert_eq!(SampleType::Int32Lsb24.container_bytes(), Some(4));
        assert_eq!(SampleType::Int24Lsb.container_bytes(), Some(3));
        assert_eq!(SampleType::Int16Msb.container_bytes(), Some(2));
        assert_eq!(SampleType::Float64Lsb.container_bytes(), Some(8));
        assert_eq!(SampleType::Unknown(99).container_bytes(), None);
    }
}
