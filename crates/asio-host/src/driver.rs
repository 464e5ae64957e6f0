//! Safe view of a driver instance.
//!
//! [`AsioDriver`] mirrors the native driver interface one call at a time. The
//! host only ever talks to a driver through this trait, which keeps the COM
//! plumbing in [`crate::instance`] and lets tests script a driver in plain
//! Rust.

use std::ffi::c_void;
use std::fmt;

use asio_sys::{self as ffi, AsioBufferInfo, AsioCallbacks};
use thiserror::Error;

use crate::buffer_size::BufferSizeLimits;
use crate::inventory::ChannelDescriptor;

/// Status code returned by a native driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsioErrorCode(pub ffi::AsioError);

impl AsioErrorCode {
    pub const OK: Self = Self(ffi::ASE_OK);
    pub const SUCCESS: Self = Self(ffi::ASE_SUCCESS);
    pub const NOT_PRESENT: Self = Self(ffi::ASE_NOT_PRESENT);
    pub const HW_MALFUNCTION: Self = Self(ffi::ASE_HW_MALFUNCTION);
    pub const INVALID_PARAMETER: Self = Self(ffi::ASE_INVALID_PARAMETER);
    pub const INVALID_MODE: Self = Self(ffi::ASE_INVALID_MODE);
    pub const SP_NOT_ADVANCING: Self = Self(ffi::ASE_SP_NOT_ADVANCING);
    pub const NO_CLOCK: Self = Self(ffi::ASE_NO_CLOCK);
    pub const NO_MEMORY: Self = Self(ffi::ASE_NO_MEMORY);

    pub fn is_ok(self) -> bool {
        self == Self::OK || self == Self::SUCCESS
    }

    /// Turns a raw status into a result tagged with the call that produced it.
    pub fn check(raw: ffi::AsioError, call: &'static str) -> DriverResult<()> {
        let code = Self(raw);
        if code.is_ok() {
            Ok(())
        } else {
            Err(DriverError { call, code })
        }
    }
}

impl fmt::Display for AsioErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::OK => "ASE_OK",
            Self::SUCCESS => "ASE_SUCCESS",
            Self::NOT_PRESENT => "ASE_NotPresent",
            Self::HW_MALFUNCTION => "ASE_HWMalfunction",
            Self::INVALID_PARAMETER => "ASE_InvalidParameter",
            Self::INVALID_MODE => "ASE_InvalidMode",
            Self::SP_NOT_ADVANCING => "ASE_SPNotAdvancing",
            Self::NO_CLOCK => "ASE_NoClock",
            Self::NO_MEMORY => "ASE_NoMemory",
            Self(raw) => return write!(f, "ASIO error {raw}"),
        };
        f.write_str(name)
    }
}

/// A native driver call reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("driver call `{call}` failed with {code}")]
pub struct DriverError {
    pub call: &'static str,
    pub code: AsioErrorCode,
}

pub type DriverResult<T> = Result<T, DriverError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl Direction {
    pub fn is_input(self) -> bool {
        matches!(self, Self::Input)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Input => "input",
            Self::Output => "output",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelCounts {
    pub inputs: usize,
    pub outputs: usize,
}

impl ChannelCounts {
    pub fn get(&self, direction: Direction) -> usize {
        match direction {
            Direction::Input => self.inputs,
            Direction::Output => self.outputs,
        }
    }
}

/// Driver latencies, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencyFrames {
    pub input: u32,
    pub output: u32,
}

/// One attached driver instance.
///
/// Releasing the instance is the implementor's `Drop`.
pub trait AsioDriver: Send {
    /// Hands the driver the host process context. `false` means the driver
    /// refused; [`AsioDriver::error_message`] then explains why.
    fn init(&mut self, sys_handle: *mut c_void) -> bool;

    fn driver_name(&self) -> String;

    /// Text describing the most recent failure.
    fn error_message(&self) -> String;

    fn start(&mut self) -> DriverResult<()>;

    fn stop(&mut self) -> DriverResult<()>;

    fn channels(&self) -> DriverResult<ChannelCounts>;

    fn latencies(&self) -> DriverResult<LatencyFrames>;

    fn buffer_size(&self) -> DriverResult<BufferSizeLimits>;

    fn can_sample_rate(&self, rate: f64) -> DriverResult<()>;

    fn sample_rate(&self) -> DriverResult<f64>;

    fn set_sample_rate(&mut self, rate: f64) -> DriverResult<()>;

    fn channel_info(&self, direction: Direction, index: usize) -> DriverResult<ChannelDescriptor>;

    /// Asks the driver to allocate double buffers for every entry of `infos`
    /// and fill in their `buffers` pointers.
    ///
    /// The driver keeps `callbacks` and invokes them from its own thread until
    /// [`AsioDriver::dispose_buffers`] returns.
    fn create_buffers(
        &mut self,
        infos: &mut [AsioBufferInfo],
        frames: u32,
        callbacks: &'static AsioCallbacks,
    ) -> DriverResult<()>;

    fn dispose_buffers(&mut self) -> DriverResult<()>;
}
