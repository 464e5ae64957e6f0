//! Raw ABI of the ASIO driver model.
//!
//! The vendor SDK headers cannot be redistributed, so the layouts below are
//! written out by hand. Every struct mirrors its C counterpart field for field
//! and is `#[repr(C)]`; nothing in this crate carries logic beyond trivial
//! constructors.
//!
//! The COM interfaces use the platform calling convention. 32-bit Windows
//! drivers expect `thiscall` for the driver interface, which this crate does
//! not model; only 64-bit targets share a single convention.

#![no_std]

use core::ffi::c_void;

pub use cty::{c_char, c_double, c_long};

pub type AsioBool = c_long;
pub type AsioError = c_long;
pub type AsioSampleRate = c_double;
pub type AsioSampleType = c_long;
pub type HResult = i32;

pub const ASIO_FALSE: AsioBool = 0;
pub const ASIO_TRUE: AsioBool = 1;

pub const ASE_OK: AsioError = 0;
pub const ASE_SUCCESS: AsioError = 0x3f48_47a0;
pub const ASE_NOT_PRESENT: AsioError = -1000;
pub const ASE_HW_MALFUNCTION: AsioError = -999;
pub const ASE_INVALID_PARAMETER: AsioError = -998;
pub const ASE_INVALID_MODE: AsioError = -997;
pub const ASE_SP_NOT_ADVANCING: AsioError = -996;
pub const ASE_NO_CLOCK: AsioError = -995;
pub const ASE_NO_MEMORY: AsioError = -994;

pub const ASIOST_INT16_MSB: AsioSampleType = 0;
pub const ASIOST_INT24_MSB: AsioSampleType = 1;
pub const ASIOST_INT32_MSB: AsioSampleType = 2;
pub const ASIOST_FLOAT32_MSB: AsioSampleType = 3;
pub const ASIOST_FLOAT64_MSB: AsioSampleType = 4;
pub const ASIOST_INT32_MSB16: AsioSampleType = 8;
pub const ASIOST_INT32_MSB18: AsioSampleType = 9;
pub const ASIOST_INT32_MSB20: AsioSampleType = 10;
pub const ASIOST_INT32_MSB24: AsioSampleType = 11;
pub const ASIOST_INT16_LSB: AsioSampleType = 16;
pub const ASIOST_INT24_LSB: AsioSampleType = 17;
pub const ASIOST_INT32_LSB: AsioSampleType = 18;
pub const ASIOST_FLOAT32_LSB: AsioSampleType = 19;
pub const ASIOST_FLOAT64_LSB: AsioSampleType = 20;
pub const ASIOST_INT32_LSB16: AsioSampleType = 24;
pub const ASIOST_INT32_LSB18: AsioSampleType = 25;
pub const ASIOST_INT32_LSB20: AsioSampleType = 26;
pub const ASIOST_INT32_LSB24: AsioSampleType = 27;
pub const ASIOST_DSD_INT8_LSB1: AsioSampleType = 32;
pub const ASIOST_DSD_INT8_MSB1: AsioSampleType = 33;
pub const ASIOST_DSD_INT8_NER8: AsioSampleType = 40;

/// Selectors passed to the `asio_message` callback.
pub const K_ASIO_SELECTOR_SUPPORTED: c_long = 1;
pub const K_ASIO_ENGINE_VERSION: c_long = 2;
pub const K_ASIO_RESET_REQUEST: c_long = 3;
pub const K_ASIO_BUFFER_SIZE_CHANGE: c_long = 4;
pub const K_ASIO_RESYNC_REQUEST: c_long = 5;
pub const K_ASIO_LATENCIES_CHANGED: c_long = 6;
pub const K_ASIO_SUPPORTS_TIME_INFO: c_long = 7;
pub const K_ASIO_SUPPORTS_TIME_CODE: c_long = 8;
pub const K_ASIO_OVERLOAD: c_long = 15;

/// `getBufferSize` granularity meaning "power of two sizes only".
pub const ASIO_GRANULARITY_POWER_OF_TWO: c_long = -1;

/// Size of the driver-owned string buffers handed to `getDriverName` and
/// `getErrorMessage`.
pub const ASIO_STRING_CAPACITY: usize = 128;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl Guid {
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }
}

pub const S_OK: HResult = 0;

/// `{00000001-0000-0000-C000-000000000046}`
pub const IID_ICLASS_FACTORY: Guid =
    Guid::new(0x0000_0001, 0x0000, 0x0000, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);

/// Name of the class-factory export every driver module provides.
pub const DLL_GET_CLASS_OBJECT: &[u8] = b"DllGetClassObject\0";

pub type DllGetClassObjectFn = unsafe extern "system" fn(
    clsid: *const Guid,
    iid: *const Guid,
    out: *mut *mut c_void,
) -> HResult;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AsioChannelInfo {
    pub channel: c_long,
    pub is_input: AsioBool,
    pub is_active: AsioBool,
    pub channel_group: c_long,
    pub sample_type: AsioSampleType,
    pub name: [c_char; 32],
}

impl Default for AsioChannelInfo {
    fn default() -> Self {
        Self {
            channel: 0,
            is_input: ASIO_FALSE,
            is_active: ASIO_FALSE,
            channel_group: 0,
            sample_type: 0,
            name: [0; 32],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AsioBufferInfo {
    pub is_input: AsioBool,
    pub channel_num: c_long,
    pub buffers: [*mut c_void; 2],
}

impl Default for AsioBufferInfo {
    fn default() -> Self {
        Self {
            is_input: ASIO_FALSE,
            channel_num: 0,
            buffers: [core::ptr::null_mut(); 2],
        }
    }
}

/// 64-bit sample position split into two 32-bit halves.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AsioSamples {
    pub hi: u32,
    pub lo: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct AsioTimeStamp {
    pub hi: u32,
    pub lo: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AsioClockSource {
    pub index: c_long,
    pub associated_channel: c_long,
    pub associated_group: c_long,
    pub is_current_source: AsioBool,
    pub name: [c_char; 32],
}

/// Extended timing block passed to `buffer_switch_time_info`. Opaque here.
#[repr(C)]
pub struct AsioTime {
    _private: [u8; 0],
}

pub type BufferSwitchFn = unsafe extern "C" fn(double_buffer_index: c_long, direct_process: AsioBool);
pub type SampleRateDidChangeFn = unsafe extern "C" fn(rate: AsioSampleRate);
pub type AsioMessageFn = unsafe extern "C" fn(
    selector: c_long,
    value: c_long,
    message: *mut c_void,
    opt: *mut c_double,
) -> c_long;
pub type BufferSwitchTimeInfoFn = unsafe extern "C" fn(
    params: *mut AsioTime,
    double_buffer_index: c_long,
    direct_process: AsioBool,
) -> *mut AsioTime;

/// Host callbacks handed to `createBuffers`. The driver keeps the pointer
/// until `disposeBuffers` returns.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AsioCallbacks {
    pub buffer_switch: Option<BufferSwitchFn>,
    pub sample_rate_did_change: Option<SampleRateDidChangeFn>,
    pub asio_message: Option<AsioMessageFn>,
    pub buffer_switch_time_info: Option<BufferSwitchTimeInfoFn>,
}

#[repr(C)]
pub struct IUnknownVtbl {
    pub query_interface:
        unsafe extern "system" fn(this: *mut c_void, iid: *const Guid, out: *mut *mut c_void) -> HResult,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

#[repr(C)]
pub struct IClassFactory {
    pub vtbl: *const IClassFactoryVtbl,
}

#[repr(C)]
pub struct IClassFactoryVtbl {
    pub unknown: IUnknownVtbl,
    pub create_instance: unsafe extern "system" fn(
        this: *mut IClassFactory,
        outer: *mut c_void,
        iid: *const Guid,
        out: *mut *mut c_void,
    ) -> HResult,
    pub lock_server: unsafe extern "system" fn(this: *mut IClassFactory, lock: i32) -> HResult,
}

#[repr(C)]
pub struct IAsio {
    pub vtbl: *const IAsioVtbl,
}

#[repr(C)]
pub struct IAsioVtbl {
    pub unknown: IUnknownVtbl,
    pub init: unsafe extern "system" fn(this: *mut IAsio, sys_handle: *mut c_void) -> AsioBool,
    pub get_driver_name: unsafe extern "system" fn(this: *mut IAsio, name: *mut c_char),
    pub get_driver_version: unsafe extern "system" fn(this: *mut IAsio) -> c_long,
    pub get_error_message: unsafe extern "system" fn(this: *mut IAsio, message: *mut c_char),
    pub start: unsafe extern "system" fn(this: *mut IAsio) -> AsioError,
    pub stop: unsafe extern "system" fn(this: *mut IAsio) -> AsioError,
    pub get_channels: unsafe extern "system" fn(
        this: *mut IAsio,
        num_inputs: *mut c_long,
        num_outputs: *mut c_long,
    ) -> AsioError,
    pub get_latencies: unsafe extern "system" fn(
        this: *mut IAsio,
        input_latency: *mut c_long,
        output_latency: *mut c_long,
    ) -> AsioError,
    pub get_buffer_size: unsafe extern "system" fn(
        this: *mut IAsio,
        min_size: *mut c_long,
        max_size: *mut c_long,
        preferred_size: *mut c_long,
        granularity: *mut c_long,
    ) -> AsioError,
    pub can_sample_rate:
        unsafe extern "system" fn(this: *mut IAsio, rate: AsioSampleRate) -> AsioError,
    pub get_sample_rate:
        unsafe extern "system" fn(this: *mut IAsio, rate: *mut AsioSampleRate) -> AsioError,
    pub set_sample_rate:
        unsafe extern "system" fn(this: *mut IAsio, rate: AsioSampleRate) -> AsioError,
    pub get_clock_sources: unsafe extern "system" fn(
        this: *mut IAsio,
        clocks: *mut AsioClockSource,
        num_sources: *mut c_long,
    ) -> AsioError,
    pub set_clock_source: unsafe extern "system" fn(this: *mut IAsio, reference: c_long) -> AsioError,
    pub get_sample_position: unsafe extern "system" fn(
        this: *mut IAsio,
        position: *mut AsioSamples,
        stamp: *mut AsioTimeStamp,
    ) -> AsioError,
    pub get_channel_info:
        unsafe extern "system" fn(this: *mut IAsio, info: *mut AsioChannelInfo) -> AsioError,
    pub create_buffers: unsafe extern "system" fn(
        this: *mut IAsio,
        infos: *mut AsioBufferInfo,
        num_channels: c_long,
        buffer_size: c_long,
        callbacks: *const AsioCallbacks,
    ) -> AsioError,
    pub dispose_buffers: unsafe extern "system" fn(this: *mut IAsio) -> AsioError,
    pub control_panel: unsafe extern "system" fn(this: *mut IAsio) -> AsioError,
    pub future:
        unsafe extern "system" fn(this: *mut IAsio, selector: c_long, opt: *mut c_void) -> AsioError,
    pub output_ready: unsafe extern "system" fn(this: *mut IAsio) -> AsioError,
}
