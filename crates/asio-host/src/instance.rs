use std::ffi::{c_void, CStr};
use std::ptr::NonNull;

use asio_sys::{
    self as ffi, c_char, c_long, AsioBufferInfo, AsioCallbacks, AsioChannelInfo, IAsio, IAsioVtbl,
};

use crate::buffer_size::BufferSizeLimits;
use crate::driver::{
    AsioDriver, AsioErrorCode, ChannelCounts, Direction, DriverError, DriverResult,
    LatencyFrames,
};
use crate::inventory::ChannelDescriptor;
use crate::sample_type::SampleType;

/// Owned reference to a driver COM object. Dropping it releases the object.
pub struct ComDriver {
    this: NonNull<IAsio>,
}

// SAFETY: the host drives the instance from one control thread at a time;
// the driver's own callback thread never goes through this handle.
unsafe impl Send for ComDriver {}

impl ComDriver {
    /// Takes over one reference to `this`.
    ///
    /// # Safety
    ///
    /// `this` must point to a live driver object whose reference the caller
    /// hands over.
    pub unsafe fn from_raw(this: NonNull<IAsio>) -> Self {
        Self { this }
    }

    fn vtbl(&self) -> &IAsioVtbl {
        // SAFETY: a live COM object always carries a valid vtable pointer.
        unsafe { &*(*self.this.as_ptr()).vtbl }
    }

    fn raw(&self) -> *mut IAsio {
        self.this.as_ptr()
    }

    fn read_string(&self, fill: unsafe extern "system" fn(*mut IAsio, *mut c_char)) -> String {
        let mut text = [0 as c_char; ffi::ASIO_STRING_CAPACITY];
        // SAFETY: the driver writes at most `ASIO_STRING_CAPACITY` bytes.
        unsafe { fill(self.raw(), text.as_mut_ptr()) };
        text[ffi::ASIO_STRING_CAPACITY - 1] = 0;
        c_text(&text)
    }
}

fn c_text(text: &[c_char]) -> String {
    // SAFETY: c_char and u8 have the same layout.
    let bytes = unsafe { std::slice::from_raw_parts(text.as_ptr().cast::<u8>(), text.len()) };
    CStr::from_bytes_until_nul(bytes)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

fn frames(raw: c_long) -> u32 {
    u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
}

fn count(raw: c_long) -> usize {
    usize::try_from(raw.max(0)).unwrap_or(0)
}

impl AsioDriver for ComDriver {
    fn init(&mut self, sys_handle: *mut c_void) -> bool {
        unsafe { (self.vtbl().init)(self.raw(), sys_handle) != ffi::ASIO_FALSE }
    }

    fn driver_name(&self) -> String {
        self.read_string(self.vtbl().get_driver_name)
    }

    fn error_message(&self) -> String {
        self.read_string(self.vtbl().get_error_message)
    }

    fn start(&mut self) -> DriverResult<()> {
        AsioErrorCode::check(unsafe { (self.vtbl().start)(self.raw()) }, "start")
    }

    fn stop(&mut self) -> DriverResult<()> {
        AsioErrorCode::check(unsafe { (self.vtbl().stop)(self.raw()) }, "stop")
    }

    fn channels(&self) -> DriverResult<ChannelCounts> {
        let (mut inputs, mut outputs): (c_long, c_long) = (0, 0);
        let raw = unsafe { (self.vtbl().get_channels)(self.raw(), &mut inputs, &mut outputs) };
        AsioErrorCode::check(raw, "getChannels")?;
        Ok(ChannelCounts {
            inputs: count(inputs),
            outputs: count(outputs),
        })
    }

    fn latencies(&self) -> DriverResult<LatencyFrames> {
        let (mut input, mut output): (c_long, c_long) = (0, 0);
        let raw = unsafe { (self.vtbl().get_latencies)(self.raw(), &mut input, &mut output) };
        AsioErrorCode::check(raw, "getLatencies")?;
        Ok(LatencyFrames {
            input: frames(input),
            output: frames(output),
        })
    }

    fn buffer_size(&self) -> DriverResult<BufferSizeLimits> {
        let (mut min, mut max, mut preferred, mut granularity): (c_long, c_long, c_long, c_long) =
            (0, 0, 0, 0);
        let raw = unsafe {
            (self.vtbl().get_buffer_size)(
                self.raw(),
                &mut min,
                &mut max,
                &mut preferred,
                &mut granularity,
            )
        };
        AsioErrorCode::check(raw, "getBufferSize")?;
        Ok(BufferSizeLimits::from_raw(min, max, preferred, granularity))
    }

    fn can_sample_rate(&self, rate: f64) -> DriverResult<()> {
        let raw = unsafe { (self.vtbl().can_sample_rate)(self.raw(), rate) };
        AsioErrorCode::check(raw, "canSampleRate")
    }

    fn sample_rate(&self) -> DriverResult<f64> {
        let mut rate: f64 = 0.0;
        let raw = unsafe { (self.vtbl().get_sample_rate)(self.raw(), &mut rate) };
        AsioErrorCode::check(raw, "getSampleRate")?;
        Ok(rate)
    }

    fn set_sample_rate(&mut self, rate: f64) -> DriverResult<()> {
        let raw = unsafe { (self.vtbl().set_sample_rate)(self.raw(), rate) };
        AsioErrorCode::check(raw, "setSampleRate")
    }

    fn channel_info(&self, direction: Direction, index: usize) -> DriverResult<ChannelDescriptor> {
        let mut info = AsioChannelInfo {
            channel: c_long::try_from(index).map_err(|_| DriverError {
                call: "getChannelInfo",
                code: AsioErrorCode::INVALID_PARAMETER,
            })?,
            is_input: c_long::from(direction.is_input()),
            ..AsioChannelInfo::default()
        };
        let raw = unsafe { (self.vtbl().get_channel_info)(self.raw(), &mut info) };
        AsioErrorCode::check(raw, "getChannelInfo")?;
        let last = info.name.len() - 1;
        info.name[last] = 0;
        Ok(ChannelDescriptor {
            index,
            direction,
            sample_type: SampleType::from_raw(info.sample_type),
            name: c_text(&info.name),
            is_active: info.is_active != ffi::ASIO_FALSE,
            group: i64::from(info.channel_group),
        })
    }

    fn create_buffers(
        &mut self,
        infos: &mut [AsioBufferInfo],
        frames: u32,
        callbacks: &'static AsioCallbacks,
    ) -> DriverResult<()> {
        let invalid = DriverError {
            call: "createBuffers",
            code: AsioErrorCode::INVALID_PARAMETER,
        };
        let channels = c_long::try_from(infos.len()).map_err(|_| invalid)?;
        let frames = c_long::try_from(frames).map_err(|_| invalid)?;
        let raw = unsafe {
            (self.vtbl().create_buffers)(self.raw(), infos.as_mut_ptr(), channels, frames, callbacks)
        };
        AsioErrorCode::check(raw, "createBuffers")
    }

    fn dispose_buffers(&mut self) -> DriverResult<()> {
        AsioErrorCode::check(
            unsafe { (self.vtbl().dispose_buffers)(self.raw()) },
            "disposeBuffers",
        )
    }
}

impl Drop for ComDriver {
    fn drop(&mut self) {
        unsafe { (self.vtbl().unknown.release)(self.raw().cast()) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_text_stops_at_nul() {
        let mut raw = [0 as c_char; 8];
        for (dst, src) in raw.iter_mut().zip(b"ASIO4") {
            *dst = *src as c_char;
        }
        assert_eq!(c_text(&raw), "ASIO4");
        let unterminated = [b'x' as c_char; 3];
        assert_eq!(c_text(&unterminated), "xxx");
    }
}
