use std::path::PathBuf;

use thiserror::Error;

use crate::buffer_size::BufferSizeError;
use crate::driver::{AsioErrorCode, Direction, DriverError};
use crate::negotiate::FormatRejection;

/// Why a driver could not be attached.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("failed to load driver module {}: {source}", path.display())]
    ModuleLoad {
        path: PathBuf,
        source: libloading::Error,
    },
    #[error("driver module {} has no class factory export: {source}", path.display())]
    MissingEntryPoint {
        path: PathBuf,
        source: libloading::Error,
    },
    #[error("class factory handshake failed (HRESULT {hresult:#010x})")]
    ClassFactory { hresult: i32 },
    #[error("class factory could not create the driver (HRESULT {hresult:#010x})")]
    CreateInstance { hresult: i32 },
    #[error("driver refused to initialise: {0}")]
    Init(String),
    #[error("channel count query failed: {0}")]
    ChannelCount(DriverError),
    #[error("{direction} channel {channel} info query failed: {source}")]
    ChannelInfo {
        direction: Direction,
        channel: usize,
        source: DriverError,
    },
}

/// A native-side failure surfaced as a hardware malfunction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Malfunction {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("wave format not supported on {direction}s: {reason}")]
    Format {
        direction: Direction,
        reason: FormatRejection,
    },
    #[error("all {0} callback slots are in use")]
    CallbackSlotsExhausted(usize),
}

/// Status of a host operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("no driver is attached")]
    NotPresent,
    #[error("no session is running")]
    NotRunning,
    #[error("hardware malfunction: {0}")]
    HwMalfunction(#[from] Malfunction),
    #[error("invalid buffer size: {0}")]
    InvalidParameter(#[from] BufferSizeError),
    #[error("stop called without a running session")]
    StopImbalance,
}

impl HostError {
    /// The native status code closest to this error.
    pub fn code(&self) -> AsioErrorCode {
        match self {
            Self::NotPresent => AsioErrorCode::NOT_PRESENT,
            Self::HwMalfunction(_) => AsioErrorCode::HW_MALFUNCTION,
            Self::InvalidParameter(_) => AsioErrorCode::INVALID_PARAMETER,
            Self::NotRunning | Self::StopImbalance => AsioErrorCode::INVALID_MODE,
        }
    }
}

impl From<DriverError> for HostError {
    fn from(err: DriverError) -> Self {
        Self::HwMalfunction(Malfunction::Driver(err))
    }
}
