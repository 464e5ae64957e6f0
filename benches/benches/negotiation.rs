use std::time::Duration;

use asio_host::buffer_size::decide;
use asio_host::time::duration_to_frames;
use asio_host::{
    BufferRequest, BufferSizeLimits, BufferSizeMode, ChannelCounts, ChannelDescriptor,
    ChannelInventory, Direction, DriverError, FormatNegotiator, FormatProbe, Granularity,
    SampleType, WaveFormat,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

struct FixedProbe {
    counts: ChannelCounts,
}

impl FormatProbe for FixedProbe {
    fn channel_counts(&self) -> Result<ChannelCounts, DriverError> {
        Ok(self.counts)
    }

    fn supports_sample_rate(&self, rate: u32) -> bool {
        matches!(rate, 44_100 | 48_000 | 96_000)
    }
}

fn channels(direction: Direction, count: usize) -> Vec<ChannelDescriptor> {
    (0..count)
        .map(|index| ChannelDescriptor {
            index,
            direction,
            sample_type: SampleType::Int32Lsb,
            name: format!("{direction:?} {index}"),
            is_active: false,
            group: 0,
        })
        .collect()
}

fn negotiate_formats(c: &mut Criterion) {
    let mut group = c.benchmark_group("negotiate");
    let inventory = ChannelInventory::from_descriptors(
        channels(Direction::Input, 64),
        channels(Direction::Output, 64),
    );
    let probe = FixedProbe {
        counts: ChannelCounts {
            inputs: 64,
            outputs: 64,
        },
    };
    let negotiator = FormatNegotiator::new(&inventory, &probe);

    let accepted = WaveFormat::extensible(64, 48_000, 32, 24, 0);
    group.bench_function("accepted_64ch", |b| {
        b.iter(|| negotiator.check(black_box(&accepted), Direction::Output, 0, 64));
    });

    let rejected = WaveFormat::pcm(2, 48_000, 16);
    group.bench_function("rejected_stereo", |b| {
        b.iter(|| negotiator.check(black_box(&rejected), Direction::Input, 0, 2));
    });

    group.finish();
}

fn decide_buffer_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_size");
    let limits = [
        BufferSizeLimits {
            min: 64,
            max: 2048,
            preferred: 256,
            granularity: Granularity::Any,
        },
        BufferSizeLimits {
            min: 32,
            max: 8192,
            preferred: 512,
            granularity: Granularity::PowerOfTwo,
        },
        BufferSizeLimits {
            min: 48,
            max: 4800,
            preferred: 480,
            granularity: Granularity::Multiple(48),
        },
    ];

    group.bench_function("best_fit_sweep", |b| {
        b.iter(|| {
            for micros in (500..50_000).step_by(500) {
                let frames = duration_to_frames(Duration::from_micros(micros), 48_000);
                let request = BufferRequest {
                    requested_frames: u32::try_from(frames).unwrap_or(u32::MAX),
                    mode: BufferSizeMode::BestFit,
                    allow_smaller: true,
                };
                for limits in &limits {
                    let _ = black_box(decide(request, limits));
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, negotiate_formats, decide_buffer_sizes);
criterion_main!(benches);
