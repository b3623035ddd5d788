//! Connection and subscription registry.
//!
//! The only shared mutable state of the bridge. Every stream slot carries a
//! generation number so that a task belonging to a replaced or cancelled
//! subscription can recognise itself as stale. Removing a slot fires its
//! stop signal; the stream task drains and exits on its own.

use std::collections::HashMap;

use tokio::sync::oneshot;
use wearlink_codec::DeviceInfo;
use wearlink_core::{ConnectionState, StreamKind};

use crate::error::BridgeError;

#[derive(Debug)]
struct StreamSlot {
    generation: u64,
    stop: oneshot::Sender<()>,
}

impl StreamSlot {
    fn stop(self) {
        // The task may already have finished.
        let _ = self.stop.send(());
    }
}

#[derive(Debug, Default)]
struct DeviceEntry {
    state: ConnectionState,
    info: Option<DeviceInfo>,
    streams: HashMap<StreamKind, StreamSlot>,
}

impl DeviceEntry {
    fn stop_streams(&mut self) -> Vec<StreamKind> {
        let mut stopped: Vec<StreamKind> = self.streams.keys().copied().collect();
        stopped.sort_unstable();
        for (_, slot) in self.streams.drain() {
            slot.stop();
        }
        stopped
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    devices: HashMap<String, DeviceEntry>,
    next_generation: u64,
}

impl Registry {
    pub fn connection_state(&self, device_id: &str) -> ConnectionState {
        self.devices
            .get(device_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Last device info seen in a connection callback.
    pub fn device_info(&self, device_id: &str) -> Option<&DeviceInfo> {
        self.devices
            .get(device_id)
            .and_then(|entry| entry.info.as_ref())
    }

    /// Marks the device connecting. A device that drops from Connected
    /// straight back to Connecting loses its streams as on a disconnect;
    /// the cancelled kinds are returned.
    pub fn set_connecting(&mut self, info: &DeviceInfo) -> Vec<StreamKind> {
        let entry = self.devices.entry(info.device_id.clone()).or_default();
        let cancelled = if entry.state == ConnectionState::Connected {
            entry.stop_streams()
        } else {
            Vec::new()
        };
        entry.state = ConnectionState::Connecting;
        entry.info = Some(info.clone());
        cancelled
    }

    pub fn set_connected(&mut self, info: &DeviceInfo) {
        let entry = self.devices.entry(info.device_id.clone()).or_default();
        entry.state = ConnectionState::Connected;
        entry.info = Some(info.clone());
    }

    /// Marks the device disconnected and stops all of its streams.
    /// Returns the kinds that were streaming.
    pub fn set_disconnected(&mut self, device_id: &str) -> Vec<StreamKind> {
        let Some(entry) = self.devices.get_mut(device_id) else {
            return Vec::new();
        };
        entry.state = ConnectionState::Disconnected;
        entry.stop_streams()
    }

    /// Reserves a stream slot on a connected device, replacing (and
    /// stopping) any previous subscription of the same kind. `stop` fires
    /// when the slot is removed.
    pub fn begin_stream(
        &mut self,
        device_id: &str,
        kind: StreamKind,
        stop: oneshot::Sender<()>,
    ) -> Result<u64, BridgeError> {
        let entry = self
            .devices
            .get_mut(device_id)
            .filter(|entry| entry.state == ConnectionState::Connected)
            .ok_or_else(|| BridgeError::NotConnected {
                device_id: device_id.to_string(),
            })?;
        self.next_generation += 1;
        let generation = self.next_generation;
        let previous = entry.streams.insert(
            kind,
            StreamSlot { generation, stop },
        );
        if let Some(previous) = previous {
            previous.stop();
        }
        Ok(generation)
    }

    /// Whether a batch from this subscription may still be delivered.
    pub fn is_live(&self, device_id: &str, kind: StreamKind, generation: u64) -> bool {
        self.devices.get(device_id).is_some_and(|entry| {
            entry.state == ConnectionState::Connected
                && entry
                    .streams
                    .get(&kind)
                    .is_some_and(|slot| slot.generation == generation)
        })
    }

    pub fn is_streaming(&self, device_id: &str, kind: StreamKind) -> bool {
        self.devices
            .get(device_id)
            .is_some_and(|entry| entry.streams.contains_key(&kind))
    }

    /// Releases a slot whose task has finished on its own.
    pub fn finish_stream(&mut self, device_id: &str, kind: StreamKind, generation: u64) -> bool {
        let Some(entry) = self.devices.get_mut(device_id) else {
            return false;
        };
        if entry
            .streams
            .get(&kind)
            .is_some_and(|slot| slot.generation == generation)
        {
            entry.streams.remove(&kind);
            return true;
        }
        false
    }

    /// Cancels a subscription. With `generation` set, only that exact
    /// subscription is cancelled; a newer one of the same kind survives.
    pub fn cancel_stream(
        &mut self,
        device_id: &str,
        kind: StreamKind,
        generation: Option<u64>,
    ) -> bool {
        let Some(entry) = self.devices.get_mut(device_id) else {
            return false;
        };
        let matches = entry
            .streams
            .get(&kind)
            .is_some_and(|slot| generation.map_or(true, |expected| slot.generation == expected));
        if !matches {
            return false;
        }
        if let Some(slot) = entry.streams.remove(&kind) {
            slot.stop();
        }
        true
    }

    /// Stops every stream of every device.
    pub fn cancel_all(&mut self) -> usize {
        self.devices
            .values_mut()
            .map(|entry| entry.stop_streams().len())
            .sum()
    }

    pub fn active_streams(&self, device_id: &str) -> Vec<StreamKind> {
        let mut kinds: Vec<StreamKind> = self
            .devices
            .get(device_id)
            .map(|entry| entry.streams.keys().copied().collect())
            .unwrap_or_default();
        kinds.sort_unstable();
        kinds
    }

    pub fn stream_count(&self) -> usize {
        self.devices.values().map(|entry| entry.streams.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot::error::TryRecvError;

    fn connected(registry: &mut Registry, device_id: &str) {
        registry.set_connected(&DeviceInfo::unnamed(device_id));
    }

    fn begin(
        registry: &mut Registry,
        device_id: &str,
        kind: StreamKind,
    ) -> (u64, oneshot::Receiver<()>) {
        let (stop, stopped) = oneshot::channel();
        let generation = registry
            .begin_stream(device_id, kind, stop)
            .expect("connected device can stream");
        (generation, stopped)
    }

    #[test]
    fn unknown_device_is_disconnected() {
        let registry = Registry::default();
        assert_eq!(
            registry.connection_state("A1"),
            ConnectionState::Disconnected
        );
        assert!(registry.device_info("A1").is_none());
    }

    #[test]
    fn streams_require_a_connected_device() {
        let mut registry = Registry::default();
        registry.set_connecting(&DeviceInfo::unnamed("A1"));
        let (stop, mut stopped) = oneshot::channel();
        let err = registry
            .begin_stream("A1", StreamKind::Ecg, stop)
            .expect_err("connecting device cannot stream");
        assert_eq!(err.code(), "state");
        assert_eq!(stopped.try_recv(), Err(TryRecvError::Closed));

        connected(&mut registry, "A1");
        begin(&mut registry, "A1", StreamKind::Ecg);
        assert_eq!(registry.connection_state("A1"), ConnectionState::Connected);
    }

    #[test]
    fn replacing_a_stream_invalidates_the_old_generation() {
        let mut registry = Registry::default();
        connected(&mut registry, "A1");
        let (first, mut first_stopped) = begin(&mut registry, "A1", StreamKind::Acc);
        let (second, mut second_stopped) = begin(&mut registry, "A1", StreamKind::Acc);
        assert_ne!(first, second);
        assert!(!registry.is_live("A1", StreamKind::Acc, first));
        assert!(registry.is_live("A1", StreamKind::Acc, second));
        assert_eq!(first_stopped.try_recv(), Ok(()));
        assert_eq!(second_stopped.try_recv(), Err(TryRecvError::Empty));

        assert!(!registry.finish_stream("A1", StreamKind::Acc, first));
        assert!(!registry.cancel_stream("A1", StreamKind::Acc, Some(first)));
        assert!(registry.is_streaming("A1", StreamKind::Acc));
    }

    #[test]
    fn cancelling_one_kind_leaves_the_others() {
        let mut registry = Registry::default();
        connected(&mut registry, "A1");
        let (_, mut ecg_stopped) = begin(&mut registry, "A1", StreamKind::Ecg);
        let (_, mut acc_stopped) = begin(&mut registry, "A1", StreamKind::Acc);

        assert!(registry.cancel_stream("A1", StreamKind::Ecg, None));
        assert_eq!(registry.active_streams("A1"), vec![StreamKind::Acc]);
        assert!(!registry.cancel_stream("A1", StreamKind::Ecg, None));
        assert_eq!(ecg_stopped.try_recv(), Ok(()));
        assert_eq!(acc_stopped.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn disconnect_tears_down_every_stream_of_that_device_only() {
        let mut registry = Registry::default();
        connected(&mut registry, "A1");
        connected(&mut registry, "B2");
        let (ecg, _) = begin(&mut registry, "A1", StreamKind::Ecg);
        begin(&mut registry, "A1", StreamKind::Ppi);
        begin(&mut registry, "B2", StreamKind::Acc);

        let cancelled = registry.set_disconnected("A1");
        assert_eq!(cancelled, vec![StreamKind::Ecg, StreamKind::Ppi]);
        assert!(!registry.is_live("A1", StreamKind::Ecg, ecg));
        assert_eq!(registry.stream_count(), 1);
        assert_eq!(registry.active_streams("B2"), vec![StreamKind::Acc]);
    }

    #[test]
    fn falling_back_to_connecting_drops_the_streams() {
        let mut registry = Registry::default();
        connected(&mut registry, "A1");
        let (ecg, mut stopped) = begin(&mut registry, "A1", StreamKind::Ecg);

        let cancelled = registry.set_connecting(&DeviceInfo::unnamed("A1"));
        assert_eq!(cancelled, vec![StreamKind::Ecg]);
        assert_eq!(stopped.try_recv(), Ok(()));
        assert!(!registry.is_streaming("A1", StreamKind::Ecg));
        assert!(!registry.cancel_stream("A1", StreamKind::Ecg, Some(ecg)));

        connected(&mut registry, "A1");
        assert!(registry.active_streams("A1").is_empty());
        assert!(registry
            .set_connecting(&DeviceInfo::unnamed("B2"))
            .is_empty());
    }

    #[test]
    fn cancel_all_reports_how_many_streams_stopped() {
        let mut registry = Registry::default();
        connected(&mut registry, "A1");
        begin(&mut registry, "A1", StreamKind::Ecg);
        begin(&mut registry, "A1", StreamKind::Ohr);
        assert_eq!(registry.cancel_all(), 2);
        assert_eq!(registry.stream_count(), 0);
    }
}
