//! The shared host: one attached driver, reference-counted sessions, and the
//! listener fan-out of the driver's buffer switches.

use std::ffi::c_void;
use std::path::Path;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use asio_sys::{c_long, AsioBufferInfo, Guid, ASIO_FALSE, ASIO_TRUE};
use tracing::{debug, error, info, warn};

use crate::buffer_size::{decide, BufferRequest, BufferSizeMode};
use crate::buffers::BufferSlot;
use crate::dispatch::{CallbackSlot, Dispatcher, OutputHalves, CALLBACK_SLOTS};
use crate::driver::{AsioDriver, Direction, DriverError};
use crate::error::{AttachError, HostError, Malfunction};
use crate::inventory::{ChannelDescriptor, ChannelInventory};
use crate::listener::BufferSwitchListener;
use crate::module::DriverModule;
use crate::negotiate::FormatNegotiator;
use crate::sample_type::SampleType;
use crate::time::{duration_to_frames, frames_to_duration};
use crate::wave_format::WaveFormat;

/// Driver latencies of the running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latency {
    pub input: Duration,
    pub output: Duration,
}

struct Session {
    format: WaveFormat,
    frames: u32,
    /// Outputs first, then inputs, each in channel order.
    buffers: Vec<AsioBufferInfo>,
    _slot: CallbackSlot,
}

// SAFETY: the buffer pointers are only handed out as views borrowing the
// host, and the callback thread reaches them through the dispatcher.
unsafe impl Send for Session {}

struct Attached {
    driver: Box<dyn AsioDriver>,
    inventory: ChannelInventory,
    name: String,
}

/// Adapter between wave-format style callers and a native ASIO driver.
///
/// A host is either fully attached (a driver instance, its module and the
/// channel inventory) or fully detached; a failed attach leaves nothing
/// behind. [`AsioSharedHost::start`] and [`AsioSharedHost::stop`] must be
/// balanced like acquire and release, and the caller serialises them.
pub struct AsioSharedHost {
    driver: Option<Box<dyn AsioDriver>>,
    inventory: ChannelInventory,
    driver_name: String,
    attach_error: Option<AttachError>,
    dispatcher: Arc<Dispatcher>,
    start_count: usize,
    session: Option<Session>,
    module: Option<DriverModule>,
}

#[cfg(windows)]
fn host_process_handle() -> *mut c_void {
    #[link(name = "kernel32")]
    extern "system" {
        fn GetModuleHandleW(name: *const u16) -> *mut c_void;
    }
    unsafe { GetModuleHandleW(ptr::null()) }
}

#[cfg(not(windows))]
fn host_process_handle() -> *mut c_void {
    ptr::null_mut()
}

/// Logs the driver's own description of its last failure.
fn report(driver: &dyn AsioDriver, err: DriverError) -> DriverError {
    let message = driver.error_message();
    error!(%err, driver_message = %message, "ASIO error");
    err
}

fn buffer_info(direction: Direction, channel: usize) -> AsioBufferInfo {
    AsioBufferInfo {
        is_input: if direction.is_input() { ASIO_TRUE } else { ASIO_FALSE },
        channel_num: channel as c_long,
        buffers: [ptr::null_mut(); 2],
    }
}

impl AsioSharedHost {
    fn detached() -> Self {
        Self {
            driver: None,
            inventory: ChannelInventory::default(),
            driver_name: String::new(),
            attach_error: None,
            dispatcher: Arc::new(Dispatcher::default()),
            start_count: 0,
            session: None,
            module: None,
        }
    }

    /// Loads the driver module at `path` and attaches the driver registered
    /// under `clsid`.
    ///
    /// Never fails outright: check [`AsioSharedHost::is_valid`] and
    /// [`AsioSharedHost::attach_error`].
    ///
    /// # Safety
    ///
    /// Runs foreign code from the module, which must be a conforming ASIO
    /// driver.
    pub unsafe fn open(path: &Path, clsid: &Guid) -> Self {
        let mut host = Self::detached();
        let loaded = unsafe { DriverModule::load(path) }.and_then(|module| {
            let driver = unsafe { module.instantiate(clsid) }?;
            Ok((module, driver))
        });
        match loaded {
            Ok((module, driver)) => match Self::attach(Box::new(driver)) {
                Ok(attached) => {
                    host.install(attached);
                    host.module = Some(module);
                }
                Err(err) => host.fail(err),
            },
            Err(err) => host.fail(err),
        }
        host
    }

    /// Attaches an already instantiated driver.
    pub fn with_driver(driver: Box<dyn AsioDriver>) -> Self {
        let mut host = Self::detached();
        match Self::attach(driver) {
            Ok(attached) => host.install(attached),
            Err(err) => host.fail(err),
        }
        host
    }

    fn attach(mut driver: Box<dyn AsioDriver>) -> Result<Attached, AttachError> {
        if !driver.init(host_process_handle()) {
            let message = driver.error_message();
            error!(driver_message = %message, "driver init failed");
            return Err(AttachError::Init(message));
        }

        let inventory = match ChannelInventory::query(driver.as_ref()) {
            Ok(inventory) => inventory,
            Err(err) => {
                let message = driver.error_message();
                error!(%err, driver_message = %message, "channel query failed");
                return Err(err);
            }
        };

        let name = driver.driver_name();
        info!(
            driver = %name,
            inputs = inventory.inputs().len(),
            outputs = inventory.outputs().len(),
            "attached ASIO driver"
        );
        Ok(Attached {
            driver,
            inventory,
            name,
        })
    }

    fn install(&mut self, attached: Attached) {
        self.driver = Some(attached.driver);
        self.inventory = attached.inventory;
        self.driver_name = attached.name;
    }

    fn fail(&mut self, err: AttachError) {
        warn!(%err, "ASIO driver not attached");
        self.attach_error = Some(err);
    }

    /// `true` while a driver instance is attached, running or not.
    pub fn is_valid(&self) -> bool {
        self.driver.is_some()
    }

    /// Why the host is not valid, if attaching failed.
    pub fn attach_error(&self) -> Option<&AttachError> {
        self.attach_error.as_ref()
    }

    pub fn driver_name(&self) -> &str {
        &self.driver_name
    }

    pub fn input_channels(&self) -> &[ChannelDescriptor] {
        self.inventory.inputs()
    }

    pub fn output_channels(&self) -> &[ChannelDescriptor] {
        self.inventory.outputs()
    }

    /// The native sample type shared by channels `first..first + count`.
    pub fn check_sample_type_across_channels(
        &self,
        direction: Direction,
        first: usize,
        count: usize,
    ) -> Option<SampleType> {
        self.inventory.common_sample_type(direction, first, count)
    }

    pub fn is_wave_format_supported(
        &self,
        format: &WaveFormat,
        direction: Direction,
        first: usize,
        count: usize,
    ) -> Result<SampleType, HostError> {
        let driver = self.driver.as_deref().ok_or(HostError::NotPresent)?;
        FormatNegotiator::new(&self.inventory, driver)
            .check(format, direction, first, count)
            .map_err(|reason| Malfunction::Format { direction, reason }.into())
    }

    /// Opens a session on the first call and only counts nested calls.
    ///
    /// A nested call does not revalidate its arguments against the running
    /// session.
    pub fn start(
        &mut self,
        format: &WaveFormat,
        suggested_duration: Duration,
        mode: BufferSizeMode,
        allow_smaller: bool,
    ) -> Result<(), HostError> {
        info!(start_count = self.start_count, "start");
        let driver = self.driver.as_deref_mut().ok_or(HostError::NotPresent)?;

        if let Some(session) = &self.session {
            if session.format != *format {
                warn!(
                    running = ?session.format,
                    requested = ?format,
                    "nested start with a different format; keeping the running session"
                );
            }
        } else {
            self.session = Some(open_session(
                driver,
                &self.inventory,
                &self.dispatcher,
                format,
                suggested_duration,
                mode,
                allow_smaller,
            )?);
        }

        self.start_count += 1;
        Ok(())
    }

    /// Closes the session once every [`AsioSharedHost::start`] is matched.
    pub fn stop(&mut self) -> Result<(), HostError> {
        if self.start_count == 0 {
            error!("too many stop calls");
            return Err(HostError::StopImbalance);
        }

        self.start_count -= 1;
        if self.start_count == 0 {
            self.close_session();
        }
        Ok(())
    }

    fn close_session(&mut self) {
        if let Some(driver) = self.driver.as_deref_mut() {
            if let Err(err) = driver.stop() {
                report(driver, err);
            }
            if let Err(err) = driver.dispose_buffers() {
                report(driver, err);
            }
        }
        self.dispatcher.disarm();
        // Releases the callback slot now that the driver is quiet.
        self.session = None;
        debug!("session closed");
    }

    pub fn start_count(&self) -> usize {
        self.start_count
    }

    /// Frames per buffer half of the running session, 0 when idle.
    pub fn buffer_num_frames(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.frames)
    }

    /// The format accepted by the running session.
    pub fn current_format(&self) -> Option<&WaveFormat> {
        self.session.as_ref().map(|s| &s.format)
    }

    pub fn latency_time(&self) -> Result<Latency, HostError> {
        let driver = self.driver.as_deref().ok_or(HostError::NotPresent)?;
        let session = self.session.as_ref().ok_or(HostError::NotRunning)?;
        let frames = driver.latencies().map_err(|err| report(driver, err))?;
        let rate = session.format.samples_per_sec;
        Ok(Latency {
            input: frames_to_duration(u64::from(frames.input), rate),
            output: frames_to_duration(u64::from(frames.output), rate),
        })
    }

    pub fn output_buffer(&self, channel: usize) -> Option<BufferSlot<'_>> {
        let session = self.session.as_ref()?;
        if channel >= self.inventory.outputs().len() {
            return None;
        }
        Some(BufferSlot::new(
            &session.buffers[channel],
            channel,
            session.frames,
        ))
    }

    pub fn input_buffer(&self, channel: usize) -> Option<BufferSlot<'_>> {
        let session = self.session.as_ref()?;
        if channel >= self.inventory.inputs().len() {
            return None;
        }
        let index = self.inventory.outputs().len() + channel;
        Some(BufferSlot::new(&session.buffers[index], channel, session.frames))
    }

    /// Registers `listener` without taking ownership of it.
    ///
    /// Returns `false` if it was already registered.
    pub fn add_buffer_switch_listener<L>(&self, listener: &Arc<L>) -> bool
    where
        L: BufferSwitchListener + 'static,
    {
        let listener: Arc<dyn BufferSwitchListener> = listener.clone();
        self.dispatcher.add_listener(&listener)
    }

    /// Returns `false` if `listener` was not registered.
    pub fn remove_buffer_switch_listener<L>(&self, listener: &Arc<L>) -> bool
    where
        L: BufferSwitchListener + 'static,
    {
        let listener: Arc<dyn BufferSwitchListener> = listener.clone();
        self.dispatcher.remove_listener(&listener)
    }

    pub fn listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    /// Buffer switches delivered since the running session started.
    pub fn buffer_switch_count(&self) -> u64 {
        self.dispatcher.switch_count()
    }
}

fn open_session(
    driver: &mut dyn AsioDriver,
    inventory: &ChannelInventory,
    dispatcher: &Arc<Dispatcher>,
    format: &WaveFormat,
    suggested_duration: Duration,
    mode: BufferSizeMode,
    allow_smaller: bool,
) -> Result<Session, HostError> {
    for direction in [Direction::Input, Direction::Output] {
        let count = inventory.channels(direction).len();
        if count == 0 {
            continue;
        }
        let negotiator = FormatNegotiator::new(inventory, &*driver);
        if let Err(reason) = negotiator.check(format, direction, 0, count) {
            error!(%direction, %reason, "wave format not supported");
            return Err(Malfunction::Format { direction, reason }.into());
        }
    }

    let rate = format.samples_per_sec;
    let current = driver.sample_rate().map_err(|err| report(&*driver, err))?;
    if current.round() != f64::from(rate) {
        info!(from = current, to = rate, "switching sample rate");
        driver
            .set_sample_rate(f64::from(rate))
            .map_err(|err| report(&*driver, err))?;
    }

    let limits = driver.buffer_size().map_err(|err| report(&*driver, err))?;
    info!(
        min = limits.min,
        max = limits.max,
        preferred = limits.preferred,
        granularity = %limits.granularity,
        "driver buffer size"
    );

    let requested_frames =
        u32::try_from(duration_to_frames(suggested_duration, rate)).unwrap_or(u32::MAX);
    let request = BufferRequest {
        requested_frames,
        mode,
        allow_smaller,
    };
    let decision = decide(request, &limits).map_err(|err| {
        error!(%err, "buffer size rejected");
        HostError::InvalidParameter(err)
    })?;
    let frames = decision.frames;
    info!(
        requested_ms = suggested_duration.as_secs_f64() * 1000.0,
        requested_frames,
        actual_ms = frames_to_duration(u64::from(frames), rate).as_secs_f64() * 1000.0,
        actual_frames = frames,
        "buffer duration"
    );

    let slot = CallbackSlot::claim(dispatcher)
        .ok_or(Malfunction::CallbackSlotsExhausted(CALLBACK_SLOTS))?;

    let outputs = inventory.outputs().len();
    let mut buffers: Vec<AsioBufferInfo> = (0..outputs)
        .map(|channel| buffer_info(Direction::Output, channel))
        .chain((0..inventory.inputs().len()).map(|channel| buffer_info(Direction::Input, channel)))
        .collect();

    driver
        .create_buffers(&mut buffers, frames, slot.callbacks())
        .map_err(|err| report(&*driver, err))?;
    debug!(slot = slot.index(), channels = buffers.len(), frames, "buffers created");

    // Clear one frame-aligned block per switch, but never past the channel's
    // own half, which holds `frames` samples of its native type.
    let frame_bytes = frames as usize * usize::from(format.block_align);
    let halves = buffers[..outputs]
        .iter()
        .zip(inventory.outputs())
        .map(|(info, channel)| OutputHalves {
            halves: info.buffers,
            zero_len: channel
                .sample_type
                .container_bytes()
                .map_or(0, |bytes| frame_bytes.min(frames as usize * bytes)),
        })
        .collect();
    dispatcher.arm(halves);

    if let Err(err) = driver.start() {
        report(&*driver, err);
        dispatcher.disarm();
        if let Err(dispose) = driver.dispose_buffers() {
            report(&*driver, dispose);
        }
        return Err(err.into());
    }

    Ok(Session {
        format: *format,
        frames,
        buffers,
        _slot: slot,
    })
}

impl Drop for AsioSharedHost {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.as_deref_mut() {
            if let Err(err) = driver.stop() {
                debug!(%err, "stop during teardown");
            }
            if let Err(err) = driver.dispose_buffers() {
                debug!(%err, "dispose during teardown");
            }
        }
        self.dispatcher.disarm();
        self.session = None;
        self.driver = None;
        self.inventory.clear();
        self.module = None;
    }
}
