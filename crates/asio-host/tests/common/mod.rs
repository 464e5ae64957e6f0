#![allow(dead_code)]

use std::ffi::c_void;
use std::sync::Arc;

use asio_host::ffi::{AsioBufferInfo, AsioCallbacks, BufferSwitchFn};
use asio_host::{
    AsioDriver, AsioErrorCode, BufferSizeLimits, ChannelCounts, ChannelDescriptor, Direction,
    DriverError, DriverResult, Granularity, LatencyFrames, SampleType, WaveFormat,
};
use parking_lot::Mutex;

/// Byte pattern the mock fills fresh buffers with.
pub const FILL: u8 = 0x5A;
/// Extra bytes past each half that the host must never touch.
pub const GUARD_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Init,
    ChannelInfo(Direction, usize),
    DriverName,
    SampleRate,
    SetSampleRate(f64),
    BufferSize,
    CreateBuffers { channels: usize, frames: u32 },
    Start,
    Stop,
    DisposeBuffers,
    Latencies,
    Release,
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub inputs: Vec<SampleType>,
    pub outputs: Vec<SampleType>,
    pub supported_rates: Vec<u32>,
    pub current_rate: f64,
    pub limits: BufferSizeLimits,
    pub latencies: LatencyFrames,
    pub fail_init: bool,
    pub fail_channel_info: Option<(Direction, usize)>,
    pub fail_sample_rate: bool,
    pub fail_set_sample_rate: bool,
    pub fail_create_buffers: bool,
    pub fail_start: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "Mock ASIO".to_string(),
            inputs: vec![SampleType::Int32Lsb; 2],
            outputs: vec![SampleType::Int32Lsb; 2],
            supported_rates: vec![44_100, 48_000],
            current_rate: 48_000.0,
            limits: BufferSizeLimits {
                min: 64,
                max: 2048,
                preferred: 256,
                granularity: Granularity::Any,
            },
            latencies: LatencyFrames {
                input: 96,
                output: 192,
            },
            fail_init: false,
            fail_channel_info: None,
            fail_sample_rate: false,
            fail_set_sample_rate: false,
            fail_create_buffers: false,
            fail_start: false,
        }
    }
}

struct MockBuffer {
    is_input: bool,
    channel: usize,
    halves: [Vec<u8>; 2],
}

struct MockState {
    config: MockConfig,
    calls: Vec<Call>,
    rate: f64,
    callbacks: Option<&'static AsioCallbacks>,
    buffers: Vec<MockBuffer>,
    running: bool,
    last_error: String,
}

pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockDriver`] handed to the host.
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

pub fn mock(config: MockConfig) -> (Box<dyn AsioDriver>, MockHandle) {
    let state = Arc::new(Mutex::new(MockState {
        rate: config.current_rate,
        config,
        calls: Vec::new(),
        callbacks: None,
        buffers: Vec::new(),
        running: false,
        last_error: String::new(),
    }));
    let handle = MockHandle {
        state: Arc::clone(&state),
    };
    (Box::new(MockDriver { state }), handle)
}

/// 24 valid bits in a 32-bit container, the format the host accepts.
pub fn stereo_24_in_32(rate: u32) -> WaveFormat {
    WaveFormat::extensible(2, rate, 32, 24, 0x3)
}

fn failure(state: &mut MockState, call: &'static str) -> DriverError {
    state.last_error = format!("mock {call} failure");
    DriverError {
        call,
        code: AsioErrorCode::HW_MALFUNCTION,
    }
}

impl AsioDriver for MockDriver {
    fn init(&mut self, _sys_handle: *mut c_void) -> bool {
        let mut state = self.state.lock();
        state.calls.push(Call::Init);
        if state.config.fail_init {
            state.last_error = "no hardware".to_string();
            return false;
        }
        true
    }

    fn driver_name(&self) -> String {
        let mut state = self.state.lock();
        state.calls.push(Call::DriverName);
        state.config.name.clone()
    }

    fn error_message(&self) -> String {
        self.state.lock().last_error.clone()
    }

    fn start(&mut self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Start);
        if state.config.fail_start {
            return Err(failure(&mut state, "start"));
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::Stop);
        state.running = false;
        Ok(())
    }

    fn channels(&self) -> DriverResult<ChannelCounts> {
        let state = self.state.lock();
        Ok(ChannelCounts {
            inputs: state.config.inputs.len(),
            outputs: state.config.outputs.len(),
        })
    }

    fn latencies(&self) -> DriverResult<LatencyFrames> {
        let mut state = self.state.lock();
        state.calls.push(Call::Latencies);
        Ok(state.config.latencies)
    }

    fn buffer_size(&self) -> DriverResult<BufferSizeLimits> {
        let mut state = self.state.lock();
        state.calls.push(Call::BufferSize);
        Ok(state.config.limits)
    }

    fn can_sample_rate(&self, rate: f64) -> DriverResult<()> {
        let state = self.state.lock();
        if state
            .config
            .supported_rates
            .iter()
            .any(|r| f64::from(*r) == rate)
        {
            Ok(())
        } else {
            Err(DriverError {
                call: "canSampleRate",
                code: AsioErrorCode::NO_CLOCK,
            })
        }
    }

    fn sample_rate(&self) -> DriverResult<f64> {
        let mut state = self.state.lock();
        state.calls.push(Call::SampleRate);
        if state.config.fail_sample_rate {
            return Err(failure(&mut state, "getSampleRate"));
        }
        Ok(state.rate)
    }

    fn set_sample_rate(&mut self, rate: f64) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::SetSampleRate(rate));
        if state.config.fail_set_sample_rate {
            return Err(failure(&mut state, "setSampleRate"));
        }
        state.rate = rate;
        Ok(())
    }

    fn channel_info(&self, direction: Direction, index: usize) -> DriverResult<ChannelDescriptor> {
        let mut state = self.state.lock();
        state.calls.push(Call::ChannelInfo(direction, index));
        if state.config.fail_channel_info == Some((direction, index)) {
            return Err(failure(&mut state, "getChannelInfo"));
        }
        let types = match direction {
            Direction::Input => &state.config.inputs,
            Direction::Output => &state.config.outputs,
        };
        Ok(ChannelDescriptor {
            index,
            direction,
            sample_type: types[index],
            name: format!("{direction} {}", index + 1),
            is_active: false,
            group: 0,
        })
    }

    fn create_buffers(
        &mut self,
        infos: &mut [AsioBufferInfo],
        frames: u32,
        callbacks: &'static AsioCallbacks,
    ) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::CreateBuffers {
            channels: infos.len(),
            frames,
        });
        if state.config.fail_create_buffers {
            return Err(failure(&mut state, "createBuffers"));
        }

        let mut buffers = Vec::with_capacity(infos.len());
        for info in infos.iter_mut() {
            let channels = if info.is_input != 0 {
                &state.config.inputs
            } else {
                &state.config.outputs
            };
            // One half holds `frames` samples of the channel's native type,
            // like a real driver allocates it.
            let sample_bytes = channels[info.channel_num as usize]
                .container_bytes()
                .unwrap_or(4);
            let len = frames as usize * sample_bytes + GUARD_BYTES;
            let mut buffer = MockBuffer {
                is_input: info.is_input != 0,
                channel: info.channel_num as usize,
                halves: [vec![FILL; len], vec![FILL; len]],
            };
            info.buffers = [
                buffer.halves[0].as_mut_ptr().cast(),
                buffer.halves[1].as_mut_ptr().cast(),
            ];
            buffers.push(buffer);
        }
        state.buffers = buffers;
        state.callbacks = Some(callbacks);
        Ok(())
    }

    fn dispose_buffers(&mut self) -> DriverResult<()> {
        let mut state = self.state.lock();
        state.calls.push(Call::DisposeBuffers);
        state.callbacks = None;
        state.buffers.clear();
        Ok(())
    }
}

impl Drop for MockDriver {
    fn drop(&mut self) {
        self.state.lock().calls.push(Call::Release);
    }
}

impl MockHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Calls recorded after the attach sequence.
    pub fn calls_since(&self, start: usize) -> Vec<Call> {
        self.state.lock().calls[start..].to_vec()
    }

    pub fn rate(&self) -> f64 {
        self.state.lock().rate
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn has_buffers(&self) -> bool {
        !self.state.lock().buffers.is_empty()
    }

    fn callbacks(&self) -> Option<&'static AsioCallbacks> {
        self.state.lock().callbacks
    }

    /// The buffer-switch entry point the host installed, if any.
    pub fn buffer_switch_callback(&self) -> Option<BufferSwitchFn> {
        self.callbacks()?.buffer_switch
    }

    /// Delivers a buffer switch the way the driver thread would. Returns
    /// `false` when no session is running.
    pub fn fire_buffer_switch(&self, half: i32) -> bool {
        let callbacks = {
            let state = self.state.lock();
            if !state.running {
                return false;
            }
            state.callbacks
        };
        match callbacks.and_then(|c| c.buffer_switch) {
            Some(switch) => {
                unsafe { switch(half.into(), 1) };
                true
            }
            None => false,
        }
    }

    pub fn send_message(&self, selector: i32, value: i32) -> Option<i64> {
        let message = self.callbacks()?.asio_message?;
        let result = unsafe {
            message(
                selector.into(),
                value.into(),
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        Some(result.into())
    }

    pub fn notify_sample_rate(&self, rate: f64) -> bool {
        match self.callbacks().and_then(|c| c.sample_rate_did_change) {
            Some(changed) => {
                unsafe { changed(rate) };
                true
            }
            None => false,
        }
    }

    pub fn fire_time_info_switch(&self, half: i32) -> Option<bool> {
        let switch = self.callbacks()?.buffer_switch_time_info?;
        let result = unsafe { switch(std::ptr::null_mut(), half.into(), 1) };
        Some(result.is_null())
    }

    /// Copy of one half of a driver buffer, including the guard bytes.
    pub fn half(&self, direction: Direction, channel: usize, half: usize) -> Vec<u8> {
        let state = self.state.lock();
        state
            .buffers
            .iter()
            .find(|b| b.is_input == direction.is_input() && b.channel == channel)
            .map(|b| b.halves[half].clone())
            .unwrap_or_default()
    }

    /// `(is_input, channel)` of every buffer in the order the host asked for.
    pub fn buffer_layout(&self) -> Vec<(bool, usize)> {
        self.state
            .lock()
            .buffers
            .iter()
            .map(|b| (b.is_input, b.channel))
            .collect()
    }
}
