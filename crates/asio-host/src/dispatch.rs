//! Real-time entry points handed to the driver.
//!
//! The driver takes bare `extern "C"` function pointers with no user-data
//! argument, so each session claims one entry of a fixed table. Every entry
//! has its own monomorphised set of trampolines that load the session's
//! [`Dispatcher`] from a static atomic and forward to it. Resolving the
//! target is a single atomic load and never allocates.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use asio_sys::{c_double, c_long, AsioBool, AsioCallbacks, AsioSampleRate, AsioTime};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::listener::{BufferSwitchListener, ListenerSet};

/// Number of sessions that can have callbacks installed at once.
pub const CALLBACK_SLOTS: usize = 32;

/// Both halves of one output channel's double buffer and how many bytes of
/// each half to clear on a switch.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputHalves {
    pub halves: [*mut c_void; 2],
    /// Never more than the driver allocated for one half of this channel.
    pub zero_len: usize,
}

// SAFETY: the pointers are driver-owned memory that is only written from the
// buffer-switch path while the session that produced them is alive.
unsafe impl Send for OutputHalves {}

#[derive(Default)]
struct DispatchState {
    listeners: ListenerSet,
    outputs: Vec<OutputHalves>,
}

/// State shared between the control thread and the driver's callback thread.
#[derive(Default)]
pub(crate) struct Dispatcher {
    state: Mutex<DispatchState>,
    listeners: AtomicUsize,
    switches: AtomicU64,
}

impl Dispatcher {
    pub fn add_listener(&self, listener: &Arc<dyn BufferSwitchListener>) -> bool {
        let mut state = self.state.lock();
        let added = state.listeners.insert(listener);
        self.listeners.store(state.listeners.len(), Ordering::Relaxed);
        added
    }

    pub fn remove_listener(&self, listener: &Arc<dyn BufferSwitchListener>) -> bool {
        let mut state = self.state.lock();
        let removed = state.listeners.remove(listener);
        self.listeners.store(state.listeners.len(), Ordering::Relaxed);
        removed
    }

    /// Membership as of the last add or remove. Does not take the lock.
    pub fn listener_count(&self) -> usize {
        self.listeners.load(Ordering::Relaxed)
    }

    /// Installs the output buffers to clear on each switch.
    ///
    /// Called after the driver created its buffers and before it is started,
    /// so the callback thread is not yet contending for the lock.
    pub fn arm(&self, outputs: Vec<OutputHalves>) {
        let previous = std::mem::replace(&mut self.state.lock().outputs, outputs);
        self.switches.store(0, Ordering::Relaxed);
        drop(previous);
    }

    /// Forgets the output buffers. Called once the driver is stopped.
    pub fn disarm(&self) {
        let previous = std::mem::take(&mut self.state.lock().outputs);
        drop(previous);
    }

    /// Clears the `half` of every output buffer, then notifies listeners.
    pub fn buffer_switch(&self, half: usize) {
        if half > 1 {
            return;
        }
        self.switches.fetch_add(1, Ordering::Relaxed);

        let state = self.state.lock();
        for output in &state.outputs {
            let buffer = output.halves[half];
            if !buffer.is_null() {
                // SAFETY: `zero_len` is capped at one half of the channel's
                // driver allocation, which stays valid while armed.
                unsafe { ptr::write_bytes(buffer.cast::<u8>(), 0, output.zero_len) };
            }
        }
        state.listeners.notify(half);
    }

    pub fn switch_count(&self) -> u64 {
        self.switches.load(Ordering::Relaxed)
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const VACANT: AtomicPtr<Dispatcher> = AtomicPtr::new(ptr::null_mut());

static ACTIVE: [AtomicPtr<Dispatcher>; CALLBACK_SLOTS] = [VACANT; CALLBACK_SLOTS];

fn active(slot: usize) -> Option<&'static Dispatcher> {
    let dispatcher = ACTIVE[slot].load(Ordering::Acquire);
    // SAFETY: a non-null entry points into an `Arc` held by the
    // `CallbackSlot` that published it, which outlives the driver's use of
    // the callbacks.
    unsafe { dispatcher.as_ref() }
}

unsafe extern "C" fn buffer_switch<const SLOT: usize>(index: c_long, _direct: AsioBool) {
    if let (Some(dispatcher), Ok(half)) = (active(SLOT), usize::try_from(index)) {
        dispatcher.buffer_switch(half);
    }
}

unsafe extern "C" fn sample_rate_did_change<const SLOT: usize>(rate: AsioSampleRate) {
    info!(slot = SLOT, rate, "driver reported a sample rate change");
}

unsafe extern "C" fn asio_message<const SLOT: usize>(
    selector: c_long,
    value: c_long,
    _message: *mut c_void,
    _opt: *mut c_double,
) -> c_long {
    debug!(slot = SLOT, selector, value, "unhandled driver message");
    0
}

unsafe extern "C" fn buffer_switch_time_info<const SLOT: usize>(
    _params: *mut AsioTime,
    index: c_long,
    _direct: AsioBool,
) -> *mut AsioTime {
    debug!(slot = SLOT, index, "ignoring time-info buffer switch");
    ptr::null_mut()
}

macro_rules! trampoline_table {
    ($($slot:literal)*) => {
        static TRAMPOLINES: [AsioCallbacks; CALLBACK_SLOTS] = [$(
            AsioCallbacks {
                buffer_switch: Some(buffer_switch::<$slot>),
                sample_rate_did_change: Some(sample_rate_did_change::<$slot>),
                asio_message: Some(asio_message::<$slot>),
                buffer_switch_time_info: Some(buffer_switch_time_info::<$slot>),
            },
        )*];
    };
}

trampoline_table!(
    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
    16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
);

/// Exclusive claim on one callback table entry.
///
/// Dropping the claim clears the entry, so it must outlive every callback
/// the driver may still deliver: stop the driver and dispose its buffers
/// first.
pub(crate) struct CallbackSlot {
    index: usize,
    _dispatcher: Arc<Dispatcher>,
}

impl CallbackSlot {
    /// `None` when every entry is taken.
    pub fn claim(dispatcher: &Arc<Dispatcher>) -> Option<Self> {
        let target = Arc::as_ptr(dispatcher).cast_mut();
        let index = ACTIVE.iter().position(|entry| {
            entry
                .compare_exchange(ptr::null_mut(), target, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })?;
        Some(Self {
            index,
            _dispatcher: Arc::clone(dispatcher),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn callbacks(&self) -> &'static AsioCallbacks {
        &TRAMPOLINES[self.index]
    }
}

impl Drop for CallbackSlot {
    fn drop(&mut self) {
        ACTIVE[self.index].store(ptr::null_mut(), Ordering::Release);
    }
}
