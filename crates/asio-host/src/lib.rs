//! Shared host for ASIO-style low-latency audio drivers.
//!
//! [`AsioSharedHost`] attaches one native driver, checks wave formats against
//! the driver's fixed per-channel sample types, picks a driver-legal buffer
//! size and runs reference-counted sessions. On every buffer switch the
//! driver's real-time thread clears the output halves and then notifies the
//! registered [`BufferSwitchListener`]s, which fill the buffers in place.

pub mod buffer_size;
mod buffers;
mod dispatch;
pub mod driver;
mod error;
mod host;
mod instance;
pub mod inventory;
mod listener;
mod module;
pub mod negotiate;
pub mod sample_type;
pub mod time;
pub mod wave_format;

pub use buffer_size::{
    BufferDecision, BufferRequest, BufferSizeError, BufferSizeLimits, BufferSizeMode, Granularity,
};
pub use buffers::BufferSlot;
pub use dispatch::CALLBACK_SLOTS;
pub use driver::{
    AsioDriver, AsioErrorCode, ChannelCounts, Direction, DriverError, DriverResult, LatencyFrames,
};
pub use error::{AttachError, HostError, Malfunction};
pub use host::{AsioSharedHost, Latency};
pub use instance::ComDriver;
pub use inventory::{ChannelDescriptor, ChannelInventory};
pub use listener::BufferSwitchListener;
pub use module::{format_clsid, parse_clsid, DriverModule};
pub use negotiate::{FormatNegotiator, FormatProbe, FormatRejection};
pub use sample_type::SampleType;
pub use wave_format::{FormatTag, WaveFormat, WaveFormatError, WaveFormatExtension};

/// Re-export the raw bindings for users that need to drop down to the ABI.
pub use asio_sys as ffi;
