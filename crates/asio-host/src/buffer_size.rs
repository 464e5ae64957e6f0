//! Turning a requested buffer length into a frame count the driver accepts.

use std::fmt;

use asio_sys::{self as ffi, c_long};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferSizeMode {
    /// Fit the requested size into the driver's envelope.
    #[default]
    BestFit,
    /// Ignore the request and use the driver's preferred size.
    AlwaysPreferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    /// Any size in range is accepted.
    Any,
    /// Sizes must be a multiple of the step.
    Multiple(u32),
    /// Sizes must be a power of two.
    PowerOfTwo,
}

impl Granularity {
    pub fn from_raw(raw: c_long) -> Self {
        if raw == ffi::ASIO_GRANULARITY_POWER_OF_TWO {
            Self::PowerOfTwo
        } else if raw > 1 {
            u32::try_from(raw).map_or(Self::Any, Self::Multiple)
        } else {
            Self::Any
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Multiple(step) => write!(f, "x{step}"),
            Self::PowerOfTwo => f.write_str("power of two"),
        }
    }
}

/// Buffer envelope reported by the driver, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSizeLimits {
    pub min: u32,
    pub max: u32,
    pub preferred: u32,
    pub granularity: Granularity,
}

impl BufferSizeLimits {
    /// Negative sizes from a misbehaving driver read as zero.
    pub fn from_raw(min: c_long, max: c_long, preferred: c_long, granularity: c_long) -> Self {
        let frames = |raw: c_long| u32::try_from(raw.max(0)).unwrap_or(u32::MAX);
        Self {
            min: frames(min),
            max: frames(max),
            preferred: frames(preferred),
            granularity: Granularity::from_raw(granularity),
        }
    }

    pub fn contains(&self, frames: u32) -> bool {
        (self.min..=self.max).contains(&frames)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRequest {
    pub requested_frames: u32,
    pub mode: BufferSizeMode,
    /// Accept a final size below `requested_frames`.
    pub allow_smaller: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDecision {
    pub frames: u32,
    pub requested_frames: u32,
}

impl BufferDecision {
    pub fn is_smaller_than_requested(&self) -> bool {
        self.frames < self.requested_frames
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferSizeError {
    #[error("buffer size ({actual}) is smaller than the requested size ({requested})")]
    SmallerThanRequested { actual: u32, requested: u32 },
    #[error("buffer size ({actual}) is outside the driver range [{min}, {max}]")]
    OutOfDriverBounds { actual: u32, min: u32, max: u32 },
}

/// Picks a frame count for `requested_frames` without validating it.
///
/// Best-fit raises sizes below the minimum to the minimum and resets sizes
/// above the maximum to the minimum as well, then applies the granularity.
pub fn choose_frames(requested_frames: u32, mode: BufferSizeMode, limits: &BufferSizeLimits) -> u32 {
    if mode == BufferSizeMode::AlwaysPreferred {
        return limits.preferred;
    }

    let mut frames = requested_frames;
    if frames < limits.min || frames > limits.max {
        frames = limits.min;
    }

    match limits.granularity {
        Granularity::Multiple(step) => {
            let rem = frames % step;
            if rem != 0 {
                frames = frames.saturating_add(step - rem);
            }
            frames
        }
        Granularity::PowerOfTwo => {
            let mut pow2 = 1u32;
            while pow2 < frames && pow2 < limits.max {
                pow2 = pow2.saturating_mul(2);
            }
            pow2
        }
        Granularity::Any => frames,
    }
}

/// Applies [`choose_frames`] and checks the result against the request and
/// the driver bounds.
pub fn decide(
    request: BufferRequest,
    limits: &BufferSizeLimits,
) -> Result<BufferDecision, BufferSizeError> {
    let frames = choose_frames(request.requested_frames, request.mode, limits);
    let decision = BufferDecision {
        frames,
        requested_frames: request.requested_frames,
    };

    if decision.is_smaller_than_requested() {
        if !request.allow_smaller {
            return Err(BufferSizeError::SmallerThanRequested {
                actual: frames,
                requested: request.requested_frames,
            });
        }
        info!(
            actual = frames,
            requested = request.requested_frames,
            "buffer size is smaller than the requested size"
        );
    }

    if !limits.contains(frames) {
        return Err(BufferSizeError::OutOfDriverBounds {
            actual: frames,
            min: limits.min,
            max: limits.max,
        });
    }
    Ok(decision)
}
