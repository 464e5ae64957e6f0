use std::ffi::c_void;
use std::marker::PhantomData;
use std::ptr::NonNull;

use asio_sys::AsioBufferInfo;

use crate::driver::Direction;

/// Borrowed view of one channel's driver-owned double buffer.
///
/// The view borrows the host, so it cannot outlive the session that created
/// the buffers.
#[derive(Debug, Clone, Copy)]
pub struct BufferSlot<'a> {
    direction: Direction,
    channel: usize,
    halves: [*mut c_void; 2],
    frames: u32,
    _session: PhantomData<&'a AsioBufferInfo>,
}

impl<'a> BufferSlot<'a> {
    pub(crate) fn new(info: &'a AsioBufferInfo, channel: usize, frames: u32) -> Self {
        let direction = if info.is_input != 0 {
            Direction::Input
        } else {
            Direction::Output
        };
        Self {
            direction,
            channel,
            halves: info.buffers,
            frames,
            _session: PhantomData,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Frames per half.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Start of `half`, or `None` for an index other than 0 or 1 or a half
    /// the driver left unset.
    pub fn half_ptr(&self, half: usize) -> Option<NonNull<c_void>> {
        self.halves.get(half).copied().and_then(NonNull::new)
    }

    /// Views `len` bytes of `half`.
    ///
    /// # Safety
    ///
    /// `len` must not exceed the bytes the driver allocated for one half,
    /// and nothing else (the driver or a listener) may access the half while
    /// the slice is alive.
    pub unsafe fn half_bytes(&self, half: usize, len: usize) -> Option<&'a mut [u8]> {
        let start = self.half_ptr(half)?;
        Some(unsafe { std::slice::from_raw_parts_mut(start.as_ptr().cast::<u8>(), len) })
    }
}
