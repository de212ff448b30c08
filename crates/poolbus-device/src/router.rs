use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use poolbus_frame::Frame;
use tracing::{debug, info, trace};

use crate::address::{DeviceAddress, DeviceFamily, BUS_MASTER};
use crate::config::RouterConfig;
use crate::decoder::{new_decoder, DeviceDecoder};
use crate::error::{Result, RouterError};
use crate::liveness::{Liveness, LivenessTransition};
use crate::sink::ChannelSink;

/// What happened to one dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// Decoded by the registered device; values went to the sink.
    Handled(DeviceAddress),
    /// No device family handles this frame.
    Unaddressed,
    /// Addressed to a device nobody registered.
    Unknown(DeviceAddress),
    /// The device's decoder rejected the payload shape.
    Dropped(DeviceAddress),
}

struct DeviceSlot {
    decoder: Box<dyn DeviceDecoder>,
    liveness: Liveness,
}

/// Registry of configured devices and the dispatch path from frames to them.
///
/// Dispatch runs on the bus reader thread and takes the registry read lock
/// only long enough to find the device. Registration may happen from any
/// thread. Each device's decoder and liveness sit behind their own lock, and
/// sink calls are made after that lock is released.
pub struct DeviceRouter {
    devices: RwLock<HashMap<DeviceAddress, Arc<Mutex<DeviceSlot>>>>,
    sink: Arc<dyn ChannelSink>,
    config: RouterConfig,
}

impl DeviceRouter {
    pub fn new(sink: Arc<dyn ChannelSink>) -> Self {
        Self::with_config(sink, RouterConfig::default())
    }

    pub fn with_config(sink: Arc<dyn ChannelSink>, config: RouterConfig) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            sink,
            config,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Bind `decoder` to `address`. The device starts in `Unknown`.
    pub fn register(&self, address: DeviceAddress, decoder: Box<dyn DeviceDecoder>) -> Result<()> {
        if !address.is_assignable() {
            return Err(RouterError::InvalidAddress(address.bus_address));
        }
        if decoder.family() != address.family {
            return Err(RouterError::FamilyMismatch {
                address,
                decoder: decoder.family(),
            });
        }

        let slot = Arc::new(Mutex::new(DeviceSlot {
            decoder,
            liveness: Liveness::new(),
        }));

        let mut devices = self.devices.write();
        if self.config.strict_registration && devices.contains_key(&address) {
            return Err(RouterError::AlreadyRegistered(address));
        }
        let replaced = devices.insert(address, slot).is_some();
        info!(device = %address, replaced, "device registered");
        Ok(())
    }

    /// Bind a fresh decoder for the address's own family.
    pub fn register_family(&self, address: DeviceAddress) -> Result<()> {
        self.register(address, new_decoder(address.family))
    }

    pub fn unregister(&self, address: DeviceAddress) -> Result<()> {
        match self.devices.write().remove(&address) {
            Some(_) => {
                info!(device = %address, "device unregistered");
                Ok(())
            }
            None => Err(RouterError::NotRegistered(address)),
        }
    }

    /// Registered addresses, sorted.
    pub fn addresses(&self) -> Vec<DeviceAddress> {
        let mut addresses: Vec<DeviceAddress> = self.devices.read().keys().copied().collect();
        addresses.sort_unstable();
        addresses
    }

    /// Liveness snapshot for a registered device.
    pub fn liveness(&self, address: DeviceAddress) -> Option<Liveness> {
        self.slot(address).map(|slot| slot.lock().liveness)
    }

    /// The registry key `frame` is addressed to, if any family handles it.
    pub fn resolve(&self, frame: &Frame) -> Option<DeviceAddress> {
        match frame {
            Frame::Standard { source, command, .. } => DeviceFamily::implied_by(*source, *command)
                .map(|family| DeviceAddress::new(family, *source)),
            Frame::Compact { destination, .. } if *destination != BUS_MASTER => Some(
                DeviceAddress::new(DeviceFamily::ChlorineGenerator, *destination),
            ),
            Frame::Compact { .. } => self.lone_generator(),
        }
    }

    /// Route and decode one frame, timestamped now.
    pub fn dispatch(&self, frame: &Frame) -> RoutingOutcome {
        self.dispatch_at(frame, Instant::now())
    }

    /// Route and decode one frame observed at `now`.
    pub fn dispatch_at(&self, frame: &Frame, now: Instant) -> RoutingOutcome {
        let Some(address) = self.resolve(frame) else {
            trace!(command = frame.command(), source = ?frame.source(), "unaddressed frame");
            return RoutingOutcome::Unaddressed;
        };
        let Some(slot) = self.slot(address) else {
            debug!(device = %address, command = frame.command(), "no device registered");
            return RoutingOutcome::Unknown(address);
        };

        let (values, transition) = {
            let mut slot = slot.lock();
            let values = match slot.decoder.decode(frame) {
                Ok(values) => values,
                Err(err) => {
                    debug!(device = %address, error = %err, "dropping frame");
                    return RoutingOutcome::Dropped(address);
                }
            };
            let transition = if slot.decoder.confirms_online(frame.command()) {
                slot.liveness.mark_online(now)
            } else {
                None
            };
            (values, transition)
        };

        trace!(device = %address, command = frame.command(), values = values.len(), "frame routed");
        if let Some(transition) = transition {
            self.emit_transition(address, transition);
        }
        for value in &values {
            self.sink.channel_updated(address, value);
        }
        RoutingOutcome::Handled(address)
    }

    /// Collaborator-driven Offline transition (timeout, I/O failure).
    pub fn force_offline(&self, address: DeviceAddress) -> Result<Option<LivenessTransition>> {
        let slot = self
            .slot(address)
            .ok_or(RouterError::NotRegistered(address))?;
        let transition = slot.lock().liveness.force_offline();
        if let Some(transition) = transition {
            self.emit_transition(address, transition);
        }
        Ok(transition)
    }

    /// Force Offline every Online device silent for longer than `timeout`.
    ///
    /// Returns the devices that went Offline.
    pub fn expire_stale(&self, now: Instant, timeout: Duration) -> Vec<DeviceAddress> {
        let slots: Vec<(DeviceAddress, Arc<Mutex<DeviceSlot>>)> = self
            .devices
            .read()
            .iter()
            .map(|(address, slot)| (*address, Arc::clone(slot)))
            .collect();

        let mut expired = Vec::new();
        for (address, slot) in slots {
            let transition = {
                let mut slot = slot.lock();
                if !slot.liveness.is_stale(now, timeout) {
                    continue;
                }
                slot.liveness.force_offline()
            };
            if let Some(transition) = transition {
                self.emit_transition(address, transition);
                expired.push(address);
            }
        }
        expired.sort_unstable();
        expired
    }

    fn slot(&self, address: DeviceAddress) -> Option<Arc<Mutex<DeviceSlot>>> {
        self.devices.read().get(&address).cloned()
    }

    fn lone_generator(&self) -> Option<DeviceAddress> {
        let devices = self.devices.read();
        let mut generators = devices
            .keys()
            .filter(|address| address.family == DeviceFamily::ChlorineGenerator);
        match (generators.next(), generators.next()) {
            (Some(address), None) => Some(*address),
            _ => None,
        }
    }

    fn emit_transition(&self, address: DeviceAddress, transition: LivenessTransition) {
        info!(
            device = %address,
            from = %transition.from,
            to = %transition.to,
            "device liveness changed"
        );
        self.sink.liveness_changed(address, transition);
    }
}

impl std::fmt::Debug for DeviceRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRouter")
            .field("devices", &self.addresses())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::liveness::LivenessStatus;
    use crate::pump::PumpDecoder;
    use crate::sink::{CollectingSink, SinkEvent};

    fn router() -> (DeviceRouter, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::new());
        (DeviceRouter::new(sink.clone()), sink)
    }

    fn pump_run(source: u8, run: u8) -> Frame {
        Frame::Standard {
            protocol: 0x00,
            destination: 0x10,
            source,
            command: 0x06,
            payload: Bytes::copy_from_slice(&[run]),
            checksum: 0,
        }
    }

    fn compact(destination: u8, command: u8, payload: &[u8]) -> Frame {
        Frame::Compact {
            destination,
            command,
            payload: Bytes::copy_from_slice(payload),
            checksum: 0,
        }
    }

    const PUMP: DeviceAddress = DeviceAddress::new(DeviceFamily::Pump, 0x60);
    const CHLORINATOR: DeviceAddress = DeviceAddress::new(DeviceFamily::ChlorineGenerator, 0x50);

    #[test]
    fn register_validates_address_and_family() {
        let (router, _) = router();
        assert_eq!(
            router.register_family(DeviceAddress::new(DeviceFamily::Controller, 0x00)),
            Err(RouterError::InvalidAddress(0x00))
        );
        assert_eq!(
            router.register(
                DeviceAddress::new(DeviceFamily::Controller, 0x10),
                Box::new(PumpDecoder::new())
            ),
            Err(RouterError::FamilyMismatch {
                address: DeviceAddress::new(DeviceFamily::Controller, 0x10),
                decoder: DeviceFamily::Pump,
            })
        );
        assert!(router.addresses().is_empty());
    }

    #[test]
    fn strict_registration_refuses_replacement() {
        let sink = Arc::new(CollectingSink::new());
        let router = DeviceRouter::with_config(
            sink,
            RouterConfig {
                strict_registration: true,
            },
        );
        router.register_family(PUMP).unwrap();
        assert_eq!(
            router.register_family(PUMP),
            Err(RouterError::AlreadyRegistered(PUMP))
        );
    }

    #[test]
    fn replacement_resets_liveness() {
        let (router, _) = router();
        router.register_family(PUMP).unwrap();
        router.dispatch(&pump_run(0x60, 0x0A));
        assert_eq!(router.liveness(PUMP).unwrap().status(), LivenessStatus::Online);

        router.register_family(PUMP).unwrap();
        assert_eq!(router.liveness(PUMP).unwrap().status(), LivenessStatus::Unknown);
    }

    #[test]
    fn unregister_unknown_device() {
        let (router, _) = router();
        assert_eq!(router.unregister(PUMP), Err(RouterError::NotRegistered(PUMP)));
        router.register_family(PUMP).unwrap();
        router.unregister(PUMP).unwrap();
        assert_eq!(router.dispatch(&pump_run(0x60, 0x0A)), RoutingOutcome::Unknown(PUMP));
    }

    #[test]
    fn unaddressed_and_unknown() {
        let (router, sink) = router();
        let unhandled = Frame::Standard {
            protocol: 0x00,
            destination: 0x10,
            source: 0x60,
            command: 0x99,
            payload: Bytes::new(),
            checksum: 0,
        };
        assert_eq!(router.dispatch(&unhandled), RoutingOutcome::Unaddressed);
        assert_eq!(router.dispatch(&pump_run(0x61, 0x0A)), RoutingOutcome::Unknown(
            DeviceAddress::new(DeviceFamily::Pump, 0x61)
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn decode_error_drops_without_liveness() {
        let (router, sink) = router();
        router.register_family(PUMP).unwrap();

        let bad = Frame::Standard {
            protocol: 0x00,
            destination: 0x10,
            source: 0x60,
            command: 0x07,
            payload: Bytes::from_static(&[0x0A, 0x02]),
            checksum: 0,
        };
        assert_eq!(router.dispatch(&bad), RoutingOutcome::Dropped(PUMP));
        assert_eq!(router.liveness(PUMP).unwrap().status(), LivenessStatus::Unknown);
        assert!(sink.is_empty());
    }

    #[test]
    fn transition_precedes_values() {
        let (router, sink) = router();
        router.register_family(PUMP).unwrap();
        assert_eq!(router.dispatch(&pump_run(0x60, 0x0A)), RoutingOutcome::Handled(PUMP));

        let events = sink.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SinkEvent::Liveness { .. }));
        assert!(matches!(events[1], SinkEvent::Channel { .. }));
    }

    #[test]
    fn compact_master_replies_need_a_lone_generator() {
        let (router, _) = router();
        let reply = compact(0x00, 0x12, &[0x4C, 0x81]);
        assert_eq!(router.resolve(&reply), None);

        router.register_family(CHLORINATOR).unwrap();
        assert_eq!(router.resolve(&reply), Some(CHLORINATOR));

        router
            .register_family(DeviceAddress::new(DeviceFamily::ChlorineGenerator, 0x51))
            .unwrap();
        assert_eq!(router.resolve(&reply), None);
        assert_eq!(router.dispatch(&reply), RoutingOutcome::Unaddressed);
    }

    #[test]
    fn salt_output_brings_chlorinator_online() {
        let (router, sink) = router();
        router.register_family(CHLORINATOR).unwrap();

        assert_eq!(
            router.dispatch(&compact(0x50, 0x11, &[0x50])),
            RoutingOutcome::Handled(CHLORINATOR)
        );
        assert_eq!(router.liveness(CHLORINATOR).unwrap().status(), LivenessStatus::Online);
        assert!(matches!(
            sink.drain().first(),
            Some(SinkEvent::Liveness { transition, .. })
                if transition.from == LivenessStatus::Unknown && transition.to == LivenessStatus::Online
        ));

        router.dispatch(&compact(0x00, 0x12, &[0x4C, 0x81]));
        assert!(sink
            .drain()
            .iter()
            .all(|event| matches!(event, SinkEvent::Channel { .. })));
    }

    #[test]
    fn force_offline_and_expire_stale() {
        let (router, sink) = router();
        let other = DeviceAddress::new(DeviceFamily::Pump, 0x61);
        router.register_family(PUMP).unwrap();
        router.register_family(other).unwrap();

        let start = Instant::now();
        let timeout = Duration::from_secs(30);
        router.dispatch_at(&pump_run(0x60, 0x0A), start);
        router.dispatch_at(&pump_run(0x61, 0x0A), start + timeout);
        sink.drain();

        assert_eq!(router.expire_stale(start + timeout + Duration::from_secs(1), timeout), vec![PUMP]);
        assert_eq!(router.liveness(PUMP).unwrap().status(), LivenessStatus::Offline);
        assert_eq!(router.liveness(other).unwrap().status(), LivenessStatus::Online);
        assert_eq!(sink.drain().len(), 1);

        assert_eq!(router.force_offline(PUMP), Ok(None));
        assert!(router.force_offline(other).unwrap().is_some());
        assert_eq!(
            router.force_offline(DeviceAddress::new(DeviceFamily::Pump, 0x62)),
            Err(RouterError::NotRegistered(DeviceAddress::new(DeviceFamily::Pump, 0x62)))
        );
    }

    #[test]
    fn registry_is_shared_across_threads() {
        let (router, _) = router();
        let router = Arc::new(router);

        let handles: Vec<_> = (0x60..0x68)
            .map(|bus_address| {
                let router = Arc::clone(&router);
                std::thread::spawn(move || {
                    router
                        .register_family(DeviceAddress::new(DeviceFamily::Pump, bus_address))
                        .unwrap();
                    router.dispatch(&pump_run(bus_address, 0x0A))
                })
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.join().unwrap(), RoutingOutcome::Handled(_)));
        }
        assert_eq!(router.addresses().len(), 8);
    }
}
