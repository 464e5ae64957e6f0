//! Per-channel metadata captured once when a driver is attached.

use tracing::debug;

use crate::driver::{AsioDriver, Direction};
use crate::error::AttachError;
use crate::sample_type::SampleType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDescriptor {
    pub index: usize,
    pub direction: Direction,
    pub sample_type: SampleType,
    pub name: String,
    pub is_active: bool,
    pub group: i64,
}

/// Snapshot of every input and output channel of the attached driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelInventory {
    inputs: Vec<ChannelDescriptor>,
    outputs: Vec<ChannelDescriptor>,
}

impl ChannelInventory {
    pub fn from_descriptors(
        inputs: Vec<ChannelDescriptor>,
        outputs: Vec<ChannelDescriptor>,
    ) -> Self {
        Self { inputs, outputs }
    }

    /// Queries the channel counts, then every input followed by every output.
    ///
    /// The first failing query aborts; nothing gathered up to that point
    /// survives.
    pub fn query<D: AsioDriver + ?Sized>(driver: &D) -> Result<Self, AttachError> {
        let counts = driver.channels().map_err(AttachError::ChannelCount)?;
        debug!(inputs = counts.inputs, outputs = counts.outputs, "querying channel info");

        let mut inventory = Self {
            inputs: Vec::with_capacity(counts.inputs),
            outputs: Vec::with_capacity(counts.outputs),
        };
        for (direction, count) in [
            (Direction::Input, counts.inputs),
            (Direction::Output, counts.outputs),
        ] {
            for index in 0..count {
                let descriptor = driver.channel_info(direction, index).map_err(|source| {
                    AttachError::ChannelInfo {
                        direction,
                        channel: index,
                        source,
                    }
                })?;
                inventory.channels_mut(direction).push(descriptor);
            }
        }
        Ok(inventory)
    }

    pub fn inputs(&self) -> &[ChannelDescriptor] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ChannelDescriptor] {
        &self.outputs
    }

    pub fn channels(&self, direction: Direction) -> &[ChannelDescriptor] {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    fn channels_mut(&mut self, direction: Direction) -> &mut Vec<ChannelDescriptor> {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    pub fn clear(&mut self) {
        self.inputs.clear();
        self.outputs.clear();
    }

    /// Returns the sample type shared by channels `first..first + count`.
    ///
    /// `None` when the range is empty, runs past the last channel, or the
    /// channels in it disagree.
    pub fn common_sample_type(
        &self,
        direction: Direction,
        first: usize,
        count: usize,
    ) -> Option<SampleType> {
        let channels = self.channels(direction);
        let end = first.checked_add(count)?;
        if count == 0 || end > channels.len() {
            return None;
        }
        let mut range = channels[first..end].iter().map(|c| c.sample_type);
        let common = range.next()?;
        range.all(|ty| ty == common).then_some(common)
    }
}
