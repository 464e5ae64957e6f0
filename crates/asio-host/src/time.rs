//! Conversions between durations and audio frames.

use std::time::Duration;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Reference-time ticks (100 ns) in one second.
pub const REFERENCE_TICKS_PER_SECOND: i64 = 10_000_000;

/// Number of frames `duration` spans at `sample_rate`, rounded to the
/// nearest frame.
pub fn duration_to_frames(duration: Duration, sample_rate: u32) -> u64 {
    let scaled = duration.as_nanos() * u128::from(sample_rate);
    let frames = (scaled + NANOS_PER_SECOND / 2) / NANOS_PER_SECOND;
    u64::try_from(frames).unwrap_or(u64::MAX)
}

/// Duration of `frames` at `sample_rate`. Zero when the rate is zero.
pub fn frames_to_duration(frames: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = u128::from(frames) * NANOS_PER_SECOND / u128::from(sample_rate);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Converts 100 ns reference-time ticks. Negative values clamp to zero.
pub fn from_reference_time(ticks: i64) -> Duration {
    let ticks = u64::try_from(ticks).unwrap_or(0);
    Duration::from_nanos(ticks.saturating_mul(100))
}

pub fn to_reference_time(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos() / 100).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_frame() {
        assert_eq!(duration_to_frames(Duration::from_millis(10), 48_000), 480);
        // 1 ms at 44.1 kHz is 44.1 frames.
        assert_eq!(duration_to_frames(Duration::from_millis(1), 44_100), 44);
        // 0.5 ms is 22.05 frames; 0.51 ms is 22.491.
        assert_eq!(duration_to_frames(Duration::from_micros(510), 44_100), 22);
        assert_eq!(duration_to_frames(Duration::from_micros(1_010), 44_100), 45);
    }

    #[test]
    fn frames_back_to_duration() {
        assert_eq!(frames_to_duration(480, 48_000), Duration::from_millis(10));
        assert_eq!(frames_to_duration(480, 0), Duration::ZERO);
    }

    #[test]
    fn reference_time_ticks() {
        assert_eq!(from_reference_time(100_000), Duration::from_millis(10));
        assert_eq!(from_reference_time(-5), Duration::ZERO);
        assert_eq!(to_reference_time(Duration::from_millis(10)), 100_000);
    }
}
