//! PCM wave-format description as applications hand it to the host.
//!
//! [`WaveFormat`] covers both the plain 18-byte header and the extensible
//! variant with its 22-byte extension block, and can be decoded from or
//! encoded to the little-endian byte layout the structures use in memory.

use asio_sys::Guid;
use thiserror::Error;

/// Size of the plain header, up to and including the extension size field.
pub const HEADER_SIZE: usize = 18;
/// Size of the extension block carried by extensible formats.
pub const EXTENSION_SIZE: u16 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatTag(pub u16);

impl FormatTag {
    pub const PCM: Self = Self(0x0001);
    pub const IEEE_FLOAT: Self = Self(0x0003);
    pub const EXTENSIBLE: Self = Self(0xFFFE);
}

/// `{00000001-0000-0010-8000-00AA00389B71}`
pub const SUBTYPE_PCM: Guid = Guid::new(
    0x0000_0001,
    0x0000,
    0x0010,
    [0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71],
);

/// `{00000003-0000-0010-8000-00AA00389B71}`
pub const SUBTYPE_IEEE_FLOAT: Guid = Guid::new(
    0x0000_0003,
    0x0000,
    0x0010,
    [0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71],
);

pub const SPEAKER_FRONT_LEFT: u32 = 0x1;
pub const SPEAKER_FRONT_RIGHT: u32 = 0x2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormatExtension {
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub sub_format: Guid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub tag: FormatTag,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Bytes of extra format information following the header.
    pub cb_size: u16,
    pub extension: Option<WaveFormatExtension>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaveFormatError {
    #[error("wave format truncated: need {needed} bytes, got {found}")]
    Truncated { needed: usize, found: usize },
}

impl WaveFormat {
    /// Plain integer PCM with consistent block alignment and byte rate.
    pub fn pcm(channels: u16, samples_per_sec: u32, bits_per_sample: u16) -> Self {
        let block_align = (bits_per_sample / 8).saturating_mul(channels);
        Self {
            tag: FormatTag::PCM,
            channels,
            samples_per_sec,
            avg_bytes_per_sec: u32::from(block_align).saturating_mul(samples_per_sec),
            block_align,
            bits_per_sample,
            cb_size: 0,
            extension: None,
        }
    }

    /// Extensible integer PCM carrying `valid_bits` inside a
    /// `container_bits` wide sample.
    pub fn extensible(
        channels: u16,
        samples_per_sec: u32,
        container_bits: u16,
        valid_bits: u16,
        channel_mask: u32,
    ) -> Self {
        let mut format = Self::pcm(channels, samples_per_sec, container_bits);
        format.tag = FormatTag::EXTENSIBLE;
        format.cb_size = EXTENSION_SIZE;
        format.extension = Some(WaveFormatExtension {
            valid_bits_per_sample: valid_bits,
            channel_mask,
            sub_format: SUBTYPE_PCM,
        });
        format
    }

    pub fn with_sub_format(mut self, sub_format: Guid) -> Self {
        if let Some(extension) = self.extension.as_mut() {
            extension.sub_format = sub_format;
        }
        self
    }

    /// The extension block, when the tag says extensible and the declared
    /// extra size is large enough to hold it.
    pub fn extended(&self) -> Option<&WaveFormatExtension> {
        if self.tag == FormatTag::EXTENSIBLE && self.cb_size >= EXTENSION_SIZE {
            self.extension.as_ref()
        } else {
            None
        }
    }

    /// Bits actually carrying audio: the valid bits for extensible formats,
    /// the container width otherwise.
    pub fn effective_bits(&self) -> u16 {
        self.extended()
            .map_or(self.bits_per_sample, |ext| ext.valid_bits_per_sample)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WaveFormatError> {
        let header = bytes.get(..HEADER_SIZE).ok_or(WaveFormatError::Truncated {
            needed: HEADER_SIZE,
            found: bytes.len(),
        })?;
        let mut reader = Reader(header);
        let mut format = Self {
            tag: FormatTag(reader.u16()),
            channels: reader.u16(),
            samples_per_sec: reader.u32(),
            avg_bytes_per_sec: reader.u32(),
            block_align: reader.u16(),
            bits_per_sample: reader.u16(),
            cb_size: reader.u16(),
            extension: None,
        };

        if format.tag == FormatTag::EXTENSIBLE && format.cb_size >= EXTENSION_SIZE {
            let needed = HEADER_SIZE + usize::from(EXTENSION_SIZE);
            let block = bytes
                .get(HEADER_SIZE..needed)
                .ok_or(WaveFormatError::Truncated {
                    needed,
                    found: bytes.len(),
                })?;
            let mut reader = Reader(block);
            let valid_bits_per_sample = reader.u16();
            let channel_mask = reader.u32();
            let data1 = reader.u32();
            let data2 = reader.u16();
            let data3 = reader.u16();
            let mut data4 = [0u8; 8];
            data4.copy_from_slice(reader.take(8));
            format.extension = Some(WaveFormatExtension {
                valid_bits_per_sample,
                channel_mask,
                sub_format: Guid::new(data1, data2, data3, data4),
            });
        }
        Ok(format)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + usize::from(EXTENSION_SIZE));
        out.extend_from_slice(&self.tag.0.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.samples_per_sec.to_le_bytes());
        out.extend_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        out.extend_from_slice(&self.block_align.to_le_bytes());
        out.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        out.extend_from_slice(&self.cb_size.to_le_bytes());
        if let Some(ext) = self.extended() {
            out.extend_from_slice(&ext.valid_bits_per_sample.to_le_bytes());
            out.extend_from_slice(&ext.channel_mask.to_le_bytes());
            out.extend_from_slice(&ext.sub_format.data1.to_le_bytes());
            out.extend_from_slice(&ext.sub_format.data2.to_le_bytes());
            out.extend_from_slice(&ext.sub_format.data3.to_le_bytes());
            out.extend_from_slice(&ext.sub_format.data4);
        }
        out
    }
}

/// Little-endian cursor over a slice whose length was checked up front.
struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> &'a [u8] {
        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        head
    }

    fn u16(&mut self) -> u16 {
        let b = self.take(2);
        u16::from_le_bytes([b[0], b[1]])
    }

    fn u32(&mut self) -> u32 {
        let b = self.take(4);
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }
}
