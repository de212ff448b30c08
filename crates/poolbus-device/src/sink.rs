use parking_lot::Mutex;
use serde::Serialize;

use crate::address::DeviceAddress;
use crate::liveness::LivenessTransition;
use crate::value::ChannelValue;

/// Receiver of everything the router decodes.
///
/// Called on the reader thread, after the device's decoder lock has been
/// released. Implementations that hand off to another thread own that boundary.
pub trait ChannelSink: Send + Sync {
    fn channel_updated(&self, address: DeviceAddress, value: &ChannelValue);

    fn liveness_changed(&self, address: DeviceAddress, transition: LivenessTransition);
}

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    Channel {
        device: DeviceAddress,
        #[serde(flatten)]
        value: ChannelValue,
    },
    Liveness {
        device: DeviceAddress,
        #[serde(flatten)]
        transition: LivenessTransition,
    },
}

impl SinkEvent {
    pub fn device(&self) -> DeviceAddress {
        match self {
            SinkEvent::Channel { device, .. } | SinkEvent::Liveness { device, .. } => *device,
        }
    }
}

/// Sink that buffers events until drained.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every event recorded so far, oldest first.
    pub fn drain(&self) -> Vec<SinkEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ChannelSink for CollectingSink {
    fn channel_updated(&self, address: DeviceAddress, value: &ChannelValue) {
        self.events.lock().push(SinkEvent::Channel {
            device: address,
            value: value.clone(),
        });
    }

    fn liveness_changed(&self, address: DeviceAddress, transition: LivenessTransition) {
        self.events.lock().push(SinkEvent::Liveness {
            device: address,
            transition,
        });
    }
}
