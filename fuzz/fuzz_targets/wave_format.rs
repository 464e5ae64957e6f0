#![no_main]

use asio_host::{
    ChannelCounts, ChannelDescriptor, ChannelInventory, Direction, DriverError, FormatNegotiator,
    FormatProbe, SampleType, WaveFormat,
};
use libfuzzer_sys::fuzz_target;

struct Probe;

impl FormatProbe for Probe {
    fn channel_counts(&self) -> Result<ChannelCounts, DriverError> {
        Ok(ChannelCounts {
            inputs: 2,
            outputs: 4,
        })
    }

    fn supports_sample_rate(&self, rate: u32) -> bool {
        rate == 44_100 || rate == 48_000
    }
}

fn inventory() -> ChannelInventory {
    let describe = |direction, sample_types: &[SampleType]| {
        sample_types
            .iter()
            .enumerate()
            .map(|(index, &sample_type)| ChannelDescriptor {
                index,
                direction,
                sample_type,
                name: String::new(),
                is_active: false,
                group: 0,
            })
            .collect()
    };
    ChannelInventory::from_descriptors(
        describe(Direction::Input, &[SampleType::Int32Lsb; 2]),
        describe(
            Direction::Output,
            &[
                SampleType::Int32Lsb,
                SampleType::Int32Lsb,
                SampleType::Int24Lsb,
                SampleType::Float32Lsb,
            ],
        ),
    )
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let Ok(format) = WaveFormat::from_bytes(bytes) else {
        return;
    };

    let inventory = inventory();
    let negotiator = FormatNegotiator::new(&inventory, &Probe);
    let direction = if selector & 0x80 == 0 {
        Direction::Input
    } else {
        Direction::Output
    };
    let first = usize::from(selector & 0x07);
    let count = usize::from((selector >> 3) & 0x0F);

    if let Ok(sample_type) = negotiator.check(&format, direction, first, count) {
        assert_eq!(sample_type, SampleType::Int32Lsb);
        assert_eq!(format.effective_bits(), 24);
    }
    assert_eq!(WaveFormat::from_bytes(&format.to_bytes()), Ok(format));
});
