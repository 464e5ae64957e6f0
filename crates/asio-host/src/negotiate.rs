//! Deciding whether a wave format can run on the attached driver's channels.
//!
//! The general rules (tag, channel count, sample rate, bit depth family,
//! alignment arithmetic, extension sanity) are checked first. After them sits
//! a much narrower gate: the only operating point wired through end to end is
//! 24 valid bits carried in a 4-byte little-endian integer container per
//! channel. Everything else is rejected even if it passed the general rules.

use thiserror::Error;

use crate::driver::{AsioDriver, ChannelCounts, Direction, DriverError};
use crate::inventory::ChannelInventory;
use crate::sample_type::SampleType;
use crate::wave_format::{FormatTag, WaveFormat, SUBTYPE_IEEE_FLOAT, SUBTYPE_PCM};

/// The live driver queries negotiation depends on.
pub trait FormatProbe {
    fn channel_counts(&self) -> Result<ChannelCounts, DriverError>;
    fn supports_sample_rate(&self, rate: u32) -> bool;
}

impl<D: AsioDriver + ?Sized> FormatProbe for D {
    fn channel_counts(&self) -> Result<ChannelCounts, DriverError> {
        self.channels()
    }

    fn supports_sample_rate(&self, rate: u32) -> bool {
        self.can_sample_rate(f64::from(rate)).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatRejection {
    #[error("channel count query failed: {0}")]
    ChannelQuery(DriverError),
    #[error("unknown format tag: {0:#06x}")]
    UnknownFormatTag(u16),
    #[error("unsupported number of channels: {requested} (driver has {available})")]
    TooManyChannels { requested: u16, available: usize },
    #[error("unsupported sample rate: {0}")]
    UnsupportedSampleRate(u32),
    #[error("bad bits per sample: {0}")]
    BitsNotByteAligned(u16),
    #[error("requested channels use multiple different sample types")]
    MixedSampleTypes,
    #[error("requested bits per sample is {bits} but the channel format is {sample_type}")]
    SampleTypeMismatch { bits: u16, sample_type: SampleType },
    #[error("requested bits per sample is not supported: {0}")]
    UnsupportedBitDepth(u16),
    #[error("unexpected block align: {found} (expected {expected})")]
    BlockAlignMismatch { found: u16, expected: u16 },
    #[error("unexpected average bytes per second: {found} (expected {expected})")]
    ByteRateMismatch { found: u32, expected: u32 },
    #[error("compressed formats are not supported")]
    CompressedSubFormat,
    #[error("IEEE float format is not supported")]
    FloatSubFormat,
    #[error("bits per sample {container} is smaller than valid bits per sample {valid}")]
    ValidBitsExceedContainer { container: u16, valid: u16 },
    #[error("block align unsupported: {0}")]
    UnsupportedBlockAlign(u16),
    #[error("bits per sample unsupported: {0}")]
    UnsupportedValidBits(u16),
    #[error("sample type {0} is not currently supported")]
    UnsupportedSampleType(SampleType),
}

/// Checks wave formats against a channel inventory and a live driver.
pub struct FormatNegotiator<'a, P: FormatProbe + ?Sized> {
    inventory: &'a ChannelInventory,
    probe: &'a P,
}

impl<'a, P: FormatProbe + ?Sized> FormatNegotiator<'a, P> {
    pub fn new(inventory: &'a ChannelInventory, probe: &'a P) -> Self {
        Self { inventory, probe }
    }

    /// Validates `format` for channels `first..first + count` in `direction`
    /// and returns the native sample type they share.
    pub fn check(
        &self,
        format: &WaveFormat,
        direction: Direction,
        first: usize,
        count: usize,
    ) -> Result<SampleType, FormatRejection> {
        let counts = self
            .probe
            .channel_counts()
            .map_err(FormatRejection::ChannelQuery)?;

        if format.tag != FormatTag::PCM && format.tag != FormatTag::EXTENSIBLE {
            return Err(FormatRejection::UnknownFormatTag(format.tag.0));
        }

        let available = counts.get(direction);
        if usize::from(format.channels) > available {
            return Err(FormatRejection::TooManyChannels {
                requested: format.channels,
                available,
            });
        }

        if !self.probe.supports_sample_rate(format.samples_per_sec) {
            return Err(FormatRejection::UnsupportedSampleRate(format.samples_per_sec));
        }

        if format.bits_per_sample % 8 != 0 {
            return Err(FormatRejection::BitsNotByteAligned(format.bits_per_sample));
        }

        let sample_type = self
            .inventory
            .common_sample_type(direction, first, count)
            .ok_or(FormatRejection::MixedSampleTypes)?;

        match format.bits_per_sample {
            16 | 24 | 32 => {
                if !sample_type.carries_container_bits(format.bits_per_sample) {
                    return Err(FormatRejection::SampleTypeMismatch {
                        bits: format.bits_per_sample,
                        sample_type,
                    });
                }
            }
            other => return Err(FormatRejection::UnsupportedBitDepth(other)),
        }

        let expected_align = (format.bits_per_sample / 8).wrapping_mul(format.channels);
        if format.block_align != expected_align {
            return Err(FormatRejection::BlockAlignMismatch {
                found: format.block_align,
                expected: expected_align,
            });
        }

        let expected_rate = u32::from(format.block_align).wrapping_mul(format.samples_per_sec);
        if format.avg_bytes_per_sec != expected_rate {
            return Err(FormatRejection::ByteRateMismatch {
                found: format.avg_bytes_per_sec,
                expected: expected_rate,
            });
        }

        if let Some(ext) = format.extended() {
            if ext.sub_format != SUBTYPE_PCM && ext.sub_format != SUBTYPE_IEEE_FLOAT {
                return Err(FormatRejection::CompressedSubFormat);
            }
            if ext.sub_format == SUBTYPE_IEEE_FLOAT {
                return Err(FormatRejection::FloatSubFormat);
            }
            if format.bits_per_sample < ext.valid_bits_per_sample {
                return Err(FormatRejection::ValidBitsExceedContainer {
                    container: format.bits_per_sample,
                    valid: ext.valid_bits_per_sample,
                });
            }
        }

        if u32::from(format.block_align) != 4 * u32::from(format.channels) {
            return Err(FormatRejection::UnsupportedBlockAlign(format.block_align));
        }
        let bits = format.effective_bits();
        if bits != 24 {
            return Err(FormatRejection::UnsupportedValidBits(bits));
        }
        if sample_type != SampleType::Int32Lsb {
            return Err(FormatRejection::UnsupportedSampleType(sample_type));
        }

        Ok(sample_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::AsioErrorCode;
    use crate::inventory::ChannelDescriptor;
    use crate::wave_format::WaveFormatExtension;
    use asio_sys::Guid;

    struct Probe {
        counts: ChannelCounts,
        rates: Vec<u32>,
        fail: bool,
    }

    impl FormatProbe for Probe {
        fn channel_counts(&self) -> Result<ChannelCounts, DriverError> {
            if self.fail {
                return Err(DriverError {
                    call: "getChannels",
                    code: AsioErrorCode::NOT_PRESENT,
                });
            }
            Ok(self.counts)
        }

        fn supports_sample_rate(&self, rate: u32) -> bool {
            self.rates.contains(&rate)
        }
    }

    fn probe(outputs: usize) -> Probe {
        Probe {
            counts: ChannelCounts { inputs: 0, outputs },
            rates: vec![44_100, 48_000],
            fail: false,
        }
    }

    fn inventory(types: &[SampleType]) -> ChannelInventory {
        let outputs = types
            .iter()
            .enumerate()
            .map(|(index, sample_type)| ChannelDescriptor {
                index,
                direction: Direction::Output,
                sample_type: *sample_type,
                name: format!("Out {index}"),
                is_active: false,
                group: 0,
            })
            .collect();
        ChannelInventory::from_descriptors(Vec::new(), outputs)
    }

    fn supported() -> WaveFormat {
        WaveFormat::extensible(2, 48_000, 32, 24, 0x3)
    }

    fn check(types: &[SampleType], format: &WaveFormat) -> Result<SampleType, FormatRejection> {
        let inventory = inventory(types);
        let probe = probe(types.len());
        FormatNegotiator::new(&inventory, &probe).check(format, Direction::Output, 0, types.len())
    }

    #[test]
    fn accepts_the_single_operating_point() {
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &supported()),
            Ok(SampleType::Int32Lsb)
        );
    }

    #[test]
    fn rejects_sixteen_bit_against_int32_channels() {
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &WaveFormat::pcm(2, 48_000, 16)),
            Err(FormatRejection::SampleTypeMismatch {
                bits: 16,
                sample_type: SampleType::Int32Lsb
            })
        );
    }

    #[test]
    fn general_rules_passing_is_not_enough() {
        // 16-bit channels pass every family check but miss the operating point.
        assert_eq!(
            check(&[SampleType::Int16Lsb; 2], &WaveFormat::pcm(2, 48_000, 16)),
            Err(FormatRejection::UnsupportedBlockAlign(4))
        );
        // Plain 32-bit PCM has 32 effective bits.
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &WaveFormat::pcm(2, 48_000, 32)),
            Err(FormatRejection::UnsupportedValidBits(32))
        );
        // Big-endian containers are in the 32-bit family but not wired up.
        assert_eq!(
            check(&[SampleType::Int32Msb; 2], &supported()),
            Err(FormatRejection::UnsupportedSampleType(SampleType::Int32Msb))
        );
        assert_eq!(
            check(&[SampleType::Float32Lsb; 2], &supported()),
            Err(FormatRejection::UnsupportedSampleType(SampleType::Float32Lsb))
        );
    }

    #[test]
    fn rejects_unknown_tags_and_channel_overflow() {
        let mut format = supported();
        format.tag = FormatTag::IEEE_FLOAT;
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &format),
            Err(FormatRejection::UnknownFormatTag(3))
        );
        assert_eq!(
            check(
                &[SampleType::Int32Lsb; 1],
                &WaveFormat::extensible(2, 48_000, 32, 24, 0x3)
            ),
            Err(FormatRejection::TooManyChannels {
                requested: 2,
                available: 1
            })
        );
    }

    #[test]
    fn sample_rate_is_asked_of_the_driver() {
        assert_eq!(
            check(
                &[SampleType::Int32Lsb; 2],
                &WaveFormat::extensible(2, 96_000, 32, 24, 0x3)
            ),
            Err(FormatRejection::UnsupportedSampleRate(96_000))
        );
    }

    #[test]
    fn channel_query_failure_rejects() {
        let inventory = inventory(&[SampleType::Int32Lsb; 2]);
        let probe = Probe {
            fail: true,
            ..probe(2)
        };
        assert!(matches!(
            FormatNegotiator::new(&inventory, &probe).check(&supported(), Direction::Output, 0, 2),
            Err(FormatRejection::ChannelQuery(_))
        ));
    }

    #[test]
    fn mixed_channel_types_reject() {
        assert_eq!(
            check(&[SampleType::Int32Lsb, SampleType::Int32Lsb24], &supported()),
            Err(FormatRejection::MixedSampleTypes)
        );
    }

    #[test]
    fn bit_depth_rules() {
        let mut format = supported();
        format.bits_per_sample = 20;
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &format),
            Err(FormatRejection::BitsNotByteAligned(20))
        );
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &WaveFormat::pcm(2, 48_000, 8)),
            Err(FormatRejection::UnsupportedBitDepth(8))
        );
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &WaveFormat::pcm(2, 48_000, 24)),
            Err(FormatRejection::SampleTypeMismatch {
                bits: 24,
                sample_type: SampleType::Int32Lsb
            })
        );
    }

    #[test]
    fn arithmetic_consistency() {
        let mut format = supported();
        format.block_align = 6;
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &format),
            Err(FormatRejection::BlockAlignMismatch {
                found: 6,
                expected: 8
            })
        );
        let mut format = supported();
        format.avg_bytes_per_sec += 1;
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &format),
            Err(FormatRejection::ByteRateMismatch {
                found: 384_001,
                expected: 384_000
            })
        );
    }

    #[test]
    fn extension_rules() {
        let float = supported().with_sub_format(SUBTYPE_IEEE_FLOAT);
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &float),
            Err(FormatRejection::FloatSubFormat)
        );

        let compressed = supported().with_sub_format(Guid::new(0x55, 0, 0x10, [0; 8]));
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &compressed),
            Err(FormatRejection::CompressedSubFormat)
        );

        let mut wide = supported();
        wide.extension = Some(WaveFormatExtension {
            valid_bits_per_sample: 33,
            ..wide.extension.unwrap()
        });
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &wide),
            Err(FormatRejection::ValidBitsExceedContainer {
                container: 32,
                valid: 33
            })
        );
    }

    #[test]
    fn short_extension_is_checked_as_plain() {
        let mut format = supported().with_sub_format(SUBTYPE_IEEE_FLOAT);
        format.cb_size = 0;
        assert_eq!(
            check(&[SampleType::Int32Lsb; 2], &format),
            Err(FormatRejection::UnsupportedValidBits(32))
        );
    }
}
