use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use asio_host::wave_format::{SPEAKER_FRONT_LEFT, SPEAKER_FRONT_RIGHT};
use asio_host::{BufferSizeMode, WaveFormat};
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SizeMode {
    #[default]
    BestFit,
    AlwaysPreferred,
}

impl From<SizeMode> for BufferSizeMode {
    fn from(mode: SizeMode) -> Self {
        match mode {
            SizeMode::BestFit => BufferSizeMode::BestFit,
            SizeMode::AlwaysPreferred => BufferSizeMode::AlwaysPreferred,
        }
    }
}

/// A session description as read from a JSON file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub driver: Option<PathBuf>,
    pub clsid: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub container_bits: u16,
    /// Equal to `container_bits` for a plain PCM format.
    pub valid_bits: u16,
    pub buffer_ms: f64,
    pub mode: SizeMode,
    pub allow_smaller: bool,
    pub seconds: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            driver: None,
            clsid: None,
            sample_rate: 48_000,
            channels: 2,
            container_bits: 32,
            valid_bits: 24,
            buffer_ms: 10.0,
            mode: SizeMode::BestFit,
            allow_smaller: false,
            seconds: 2.0,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read session file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("{} is not a valid session file", path.display()))
    }

    pub fn wave_format(&self) -> WaveFormat {
        if self.valid_bits == self.container_bits {
            WaveFormat::pcm(self.channels, self.sample_rate, self.container_bits)
        } else {
            let mask = match self.channels {
                1 => SPEAKER_FRONT_LEFT,
                2 => SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT,
                _ => 0,
            };
            WaveFormat::extensible(
                self.channels,
                self.sample_rate,
                self.container_bits,
                self.valid_bits,
                mask,
            )
        }
    }

    pub fn buffer_duration(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.buffer_ms / 1000.0)
            .with_context(|| format!("invalid buffer length {} ms", self.buffer_ms))
    }

    pub fn run_time(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.seconds)
            .with_context(|| format!("invalid run time {} s", self.seconds))
    }

    pub fn driver(&self) -> Result<(&Path, &str)> {
        match (&self.driver, &self.clsid) {
            (Some(driver), Some(clsid)) => Ok((driver, clsid)),
            (None, _) => bail!("no driver module given (use --driver or the session file)"),
            (_, None) => bail!("no driver class id given (use --clsid or the session file)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asio_host::FormatTag;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{ "driver": "C:/drivers/asio.dll", "sample_rate": 44100, "mode": "always-preferred" }"#,
        )
        .unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.mode, SizeMode::AlwaysPreferred);
        assert_eq!(config.channels, 2);
        assert!(config.driver().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<SessionConfig>(r#"{ "rate": 1 }"#).is_err());
    }

    #[test]
    fn format_follows_bit_depths() {
        let extensible = SessionConfig::default().wave_format();
        assert_eq!(extensible.tag, FormatTag::EXTENSIBLE);
        assert_eq!(extensible.effective_bits(), 24);
        assert_eq!(extensible.block_align, 8);

        let plain = SessionConfig {
            container_bits: 16,
            valid_bits: 16,
            ..SessionConfig::default()
        }
        .wave_format();
        assert_eq!(plain.tag, FormatTag::PCM);
        assert_eq!(plain.block_align, 4);
    }

    #[test]
    fn durations_reject_negative_values() {
        let config = SessionConfig {
            buffer_ms: -1.0,
            ..SessionConfig::default()
        };
        assert!(config.buffer_duration().is_err());
        assert_eq!(
            SessionConfig::default().buffer_duration().unwrap(),
            Duration::from_millis(10)
        );
    }
}
