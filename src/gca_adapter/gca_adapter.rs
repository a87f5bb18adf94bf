use tracing::{debug, error, info, trace, warn};

use super::gca_pad::{GcaPad, Pad, RumbleEffect};
use super::gca_state::{GcaState, PortStatus, PORT_COUNT, STATE_LEN};
use crate::{
    buttons::ButtonMask,
    config::{Config, PID_NINTENDO_GCA, VID_NINTENDO},
    error::{AdapterError, TransportError},
    slots::SlotTable,
    transport::Transport,
};

/// Largest packet a single interrupt read can return.
const READ_BUF_LEN: usize = 64;

/// Device driver interface the HID layer dispatches through.
pub trait HidDevice {
    /// Whether this driver handles the given vendor/product pair.
    fn detect(vendor_id: u16, product_id: u16) -> bool
    where
        Self: Sized;

    fn name(&self) -> &str;

    /// Process one inbound state packet.
    fn handle_packet(&mut self, buf: &[u8]);
}

/// Pad lifecycle notification delivered to the host input core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PadEvent {
    Connected {
        port: usize,
        slot: usize,
        name: String,
    },
    Disconnected {
        port: usize,
        slot: usize,
    },
}

/// One Wii U Gamecube adapter and the pads plugged into it.
///
/// Each packet read from the adapter is scanned port by port. A port whose
/// status turns connected gets a pad in the slot table; a port that goes
/// empty or starts initializing gives its slot back.
pub struct GcaAdapter<T: Transport, S: SlotTable> {
    transport: T,
    slots: S,
    name: String,
    state: GcaState,
    pads: [Option<GcaPad>; PORT_COUNT],
    online: bool,
    pad_callback: Option<Box<dyn FnMut(PadEvent) + Send + 'static>>,
}

impl<T: Transport, S: SlotTable> GcaAdapter<T, S> {
    /// Activate the adapter and prime the state buffer with one read.
    pub fn create(mut transport: T, slots: S, config: &Config) -> Result<Self, AdapterError> {
        info!("Bringing up {}", config.adapter_name);

        transport
            .send_control(config.activation.packet())
            .map_err(AdapterError::Activation)?;

        let mut buf = [0u8; READ_BUF_LEN];
        let mut state = GcaState::default();
        match transport.read(&mut buf) {
            Ok(len) => {
                if !state.update(&buf[..len]) {
                    warn!("Priming read returned {} bytes, ignoring", len);
                }
            }
            Err(err) if err.is_timeout() => {
                warn!("Priming read timed out, waiting for the first report");
            }
            Err(err) => return Err(AdapterError::PrimingRead(err)),
        }

        info!("{} online", config.adapter_name);
        Ok(Self {
            transport,
            slots,
            name: config.adapter_name.clone(),
            state,
            pads: Default::default(),
            online: true,
            pad_callback: None,
        })
    }

    /// Disconnect every pad and release the adapter.
    pub fn destroy(mut self) {
        self.shutdown();
    }

    /// Install a callback to be notified when pads appear or disappear.
    pub fn set_pad_callback<F>(&mut self, callback: F)
    where
        F: FnMut(PadEvent) + Send + 'static,
    {
        self.pad_callback = Some(Box::new(callback));
    }

    /// Perform a single read from the transport and process it.
    ///
    /// Returns `Ok(false)` when the read timed out without data.
    pub fn poll_once(&mut self) -> Result<bool, TransportError> {
        let mut buf = [0u8; READ_BUF_LEN];
        match self.transport.read(&mut buf) {
            Ok(len) => {
                self.handle_packet(&buf[..len]);
                Ok(true)
            }
            Err(err) if err.is_timeout() => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn state(&self) -> &GcaState {
        &self.state
    }

    pub fn slot_table(&self) -> &S {
        &self.slots
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Pad owned by `port`, if one is registered.
    pub fn pad(&self, port: usize) -> Option<&GcaPad> {
        self.pads.get(port)?.as_ref()
    }

    pub fn pads(&self) -> impl Iterator<Item = &GcaPad> {
        self.pads.iter().flatten()
    }

    pub fn pad_at_slot(&self, slot: usize) -> Option<&dyn Pad> {
        self.pads()
            .find(|pad| pad.slot() == slot)
            .map(|pad| pad as &dyn Pad)
    }

    pub fn buttons_at_slot(&self, slot: usize) -> ButtonMask {
        self.pad_at_slot(slot)
            .map(|pad| pad.buttons())
            .unwrap_or_default()
    }

    pub fn axis_at_slot(&self, slot: usize, axis: usize) -> i16 {
        self.pad_at_slot(slot).map(|pad| pad.axis(axis)).unwrap_or(0)
    }

    pub fn set_rumble_at_slot(&mut self, slot: usize, effect: RumbleEffect, strength: u16) {
        if let Some(pad) = self.pads.iter_mut().flatten().find(|pad| pad.slot() == slot) {
            pad.set_rumble(effect, strength);
        }
    }

    fn scan_ports(&mut self) {
        for port in 0..PORT_COUNT {
            let Some(status) = self.state.status(port) else {
                continue;
            };
            let registered = self.pads[port].is_some();

            match status {
                PortStatus::Initializing | PortStatus::Empty => {
                    if registered {
                        info!("Gamepad at port {} disconnected", port + 1);
                        self.unregister_pad(port);
                    }
                }
                PortStatus::Connected => {
                    if !registered {
                        info!("Gamepad at port {} connected", port + 1);
                        if self.register_pad(port).is_none() {
                            error!("Failed to register pad at port {}", port + 1);
                            continue;
                        }
                    }
                    self.forward_packet(port);
                }
                PortStatus::Unknown(byte) => {
                    trace!("Port {} reported unknown status {:#04x}", port + 1, byte);
                }
            }
        }
    }

    fn forward_packet(&mut self, port: usize) {
        let (Some(slice), Some(pad)) = (self.state.port_slice(port), self.pads[port].as_mut())
        else {
            return;
        };
        pad.packet_handler(slice);
    }

    fn register_pad(&mut self, port: usize) -> Option<usize> {
        if !self.online || port >= PORT_COUNT {
            return None;
        }

        let Some(slot) = self.slots.find_vacant() else {
            warn!("No vacant pad slot for port {}", port + 1);
            return None;
        };

        let pad = GcaPad::new(slot, port, &self.name);
        let name = pad.name().to_string();
        self.pads[port] = Some(pad);
        self.slots.mark_connected(slot);
        debug!("Port {} bound to slot {} as {:?}", port + 1, slot, name);

        self.emit(PadEvent::Connected { port, slot, name });
        Some(slot)
    }

    fn unregister_pad(&mut self, port: usize) {
        let Some(pad) = self.pads.get_mut(port).and_then(Option::take) else {
            return;
        };

        let slot = pad.slot();
        drop(pad);
        self.slots.mark_disconnected(slot);
        debug!("Port {} released slot {}", port + 1, slot);

        self.emit(PadEvent::Disconnected { port, slot });
    }

    fn shutdown(&mut self) {
        if !self.online {
            return;
        }
        self.online = false;
        for port in 0..PORT_COUNT {
            self.unregister_pad(port);
        }
        info!("{} offline", self.name);
    }

    fn emit(&mut self, event: PadEvent) {
        if let Some(cb) = self.pad_callback.as_mut() {
            cb(event);
        }
    }
}

impl<T: Transport, S: SlotTable> HidDevice for GcaAdapter<T, S> {
    fn detect(vendor_id: u16, product_id: u16) -> bool {
        vendor_id == VID_NINTENDO && product_id == PID_NINTENDO_GCA
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn handle_packet(&mut self, buf: &[u8]) {
        if !self.online {
            return;
        }
        if buf.len() > STATE_LEN {
            warn!("Dropping oversized {}-byte packet", buf.len());
            return;
        }
        if self.state.update(buf) {
            self.scan_ports();
        }
    }
}

impl<T: Transport, S: SlotTable> Drop for GcaAdapter<T, S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::{buttons::JoypadButton, config::Activation, slots::PadList};

    #[derive(Default)]
    struct FakeTransport {
        writes: Vec<Vec<u8>>,
        reads: VecDeque<Result<Vec<u8>, TransportError>>,
        fail_write: bool,
    }

    impl Transport for FakeTransport {
        fn send_control(&mut self, data: &[u8]) -> Result<(), TransportError> {
            if self.fail_write {
                return Err(TransportError::Usb(rusb::Error::Pipe));
            }
            self.writes.push(data.to_vec());
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
            match self.reads.pop_front() {
                Some(Ok(data)) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok(data.len())
                }
                Some(Err(err)) => Err(err),
                None => Err(TransportError::Usb(rusb::Error::Timeout)),
            }
        }
    }

    fn packet(statuses: [u8; PORT_COUNT]) -> Vec<u8> {
        let mut buf = vec![0u8; STATE_LEN];
        buf[0] = 0x21;
        for (port, status) in statuses.iter().enumerate() {
            buf[1 + port * 9] = *status;
        }
        buf
    }

    fn adapter(capacity: usize) -> GcaAdapter<FakeTransport, PadList> {
        let transport = FakeTransport {
            reads: VecDeque::from([Ok(packet([0x04; 4]))]),
            ..Default::default()
        };
        GcaAdapter::create(transport, PadList::new(capacity), &Config::default()).unwrap()
    }

    fn recorded(
        adapter: &mut GcaAdapter<FakeTransport, PadList>,
    ) -> Arc<Mutex<Vec<PadEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        adapter.set_pad_callback(move |event| sink.lock().unwrap().push(event));
        events
    }

    #[test]
    fn create_writes_activation_and_primes_state() {
        let adapter = adapter(4);
        assert_eq!(adapter.transport().writes, vec![Activation::default().packet().to_vec()]);
        assert!(adapter.is_online());
        assert_eq!(adapter.state().status(0), Some(PortStatus::Empty));
        assert_eq!(adapter.pads().count(), 0);
    }

    #[test]
    fn create_uses_configured_activation() {
        let transport = FakeTransport {
            reads: VecDeque::from([Ok(packet([0x04; 4]))]),
            ..Default::default()
        };
        let config = Config {
            activation: Activation::Wii,
            ..Config::default()
        };
        let adapter = GcaAdapter::create(transport, PadList::new(1), &config).unwrap();
        assert_eq!(adapter.transport().writes, vec![vec![0x01, 0x13]]);
    }

    #[test]
    fn create_fails_on_activation_error() {
        let transport = FakeTransport {
            fail_write: true,
            ..Default::default()
        };
        let result = GcaAdapter::create(transport, PadList::new(1), &Config::default());
        assert!(matches!(result, Err(AdapterError::Activation(_))));
    }

    #[test]
    fn create_fails_on_priming_read_error() {
        let transport = FakeTransport {
            reads: VecDeque::from([Err(TransportError::Usb(rusb::Error::NoDevice))]),
            ..Default::default()
        };
        let result = GcaAdapter::create(transport, PadList::new(1), &Config::default());
        assert!(matches!(result, Err(AdapterError::PrimingRead(_))));
    }

    #[test]
    fn create_survives_priming_read_timeout() {
        let mut adapter =
            GcaAdapter::create(FakeTransport::default(), PadList::new(1), &Config::default())
                .unwrap();
        assert!(adapter.is_online());
        assert_eq!(adapter.state().status(0), Some(PortStatus::Initializing));

        adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));
        assert!(adapter.pad(0).is_some());
    }

    #[test]
    fn single_connected_port_creates_one_pad() {
        let mut adapter = adapter(4);
        let events = recorded(&mut adapter);

        adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));

        assert_eq!(adapter.pads().count(), 1);
        let pad = adapter.pad(0).unwrap();
        assert_eq!(pad.port(), 0);
        assert_eq!(pad.name(), "Wii U Gamecube Adapter [Port 1]");
        assert!(adapter.slot_table().is_connected(pad.slot()));
        assert_eq!(
            *events.lock().unwrap(),
            vec![PadEvent::Connected {
                port: 0,
                slot: 0,
                name: "Wii U Gamecube Adapter [Port 1]".to_string(),
            }]
        );
    }

    #[test]
    fn connect_then_empty_registers_and_unregisters_once() {
        let mut adapter = adapter(4);
        let events = recorded(&mut adapter);

        adapter.handle_packet(&packet([0x04, 0x04, 0x04, 0x04]));
        adapter.handle_packet(&packet([0x04, 0x14, 0x04, 0x04]));
        adapter.handle_packet(&packet([0x04, 0x04, 0x04, 0x04]));

        assert!(adapter.pad(1).is_none());
        assert!(adapter.pad_at_slot(0).is_none());
        assert_eq!(adapter.slot_table().connected_count(), 0);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                PadEvent::Connected {
                    port: 1,
                    slot: 0,
                    name: "Wii U Gamecube Adapter [Port 2]".to_string(),
                },
                PadEvent::Disconnected { port: 1, slot: 0 },
            ]
        );
    }

    #[test]
    fn initializing_status_also_disconnects() {
        let mut adapter = adapter(4);
        adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));
        adapter.handle_packet(&packet([0x00, 0x04, 0x04, 0x04]));
        assert!(adapter.pad(0).is_none());
    }

    #[test]
    fn repeated_connected_status_keeps_the_same_pad() {
        let mut adapter = adapter(4);
        let events = recorded(&mut adapter);

        for _ in 0..3 {
            adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));
        }

        assert_eq!(events.lock().unwrap().len(), 1);
        assert_eq!(adapter.pads().count(), 1);
        assert_eq!(adapter.slot_table().connected_count(), 1);
    }

    #[test]
    fn unknown_status_neither_forwards_nor_unregisters() {
        let mut adapter = adapter(4);
        let mut buf = packet([0x14, 0x04, 0x04, 0x04]);
        buf[4] = 0x01;
        adapter.handle_packet(&buf);

        let mut unknown = packet([0x10, 0x04, 0x04, 0x04]);
        unknown[4] = 0x02;
        adapter.handle_packet(&unknown);

        let pad = adapter.pad(0).unwrap();
        assert_eq!(pad.buttons(), ButtonMask::from(JoypadButton::A));
    }

    #[test]
    fn unknown_status_on_free_port_registers_nothing() {
        let mut adapter = adapter(4);
        adapter.handle_packet(&packet([0x10, 0xFF, 0x04, 0x00]));
        assert_eq!(adapter.pads().count(), 0);
    }

    #[test]
    fn oversized_packet_leaves_everything_unchanged() {
        let mut adapter = adapter(4);
        adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));
        let state = adapter.state().clone();

        let mut oversized = packet([0x04, 0x14, 0x14, 0x14]);
        oversized.push(0);
        adapter.handle_packet(&oversized);

        assert_eq!(*adapter.state(), state);
        assert!(adapter.pad(0).is_some());
        assert_eq!(adapter.pads().count(), 1);
    }

    #[test]
    fn short_packet_leaves_later_ports_unchanged() {
        let mut adapter = adapter(4);
        let mut buf = packet([0x14, 0x14, 0x04, 0x14]);
        buf[10 + 4] = 0x08;
        adapter.handle_packet(&buf);
        let before = adapter.state().clone();

        let mut short = packet([0x04, 0x04, 0x04, 0x04]);
        short.truncate(10);
        adapter.handle_packet(&short);

        assert!(adapter.pad(0).is_none());
        for port in 1..PORT_COUNT {
            assert_eq!(adapter.state().port_slice(port), before.port_slice(port));
        }
        assert!(adapter.pad(1).is_some());
        assert!(adapter.pad(2).is_none());
        assert!(adapter.pad(3).is_some());
        let slot = adapter.pad(1).unwrap().slot();
        assert_eq!(adapter.buttons_at_slot(slot), ButtonMask::from(JoypadButton::L));
    }

    #[test]
    fn rumble_at_slot_is_a_no_op() {
        let mut adapter = adapter(4);
        adapter.handle_packet(&packet([0x14, 0x04, 0x04, 0x04]));
        let pad = adapter.pad(0).unwrap().clone();

        adapter.set_rumble_at_slot(pad.slot(), RumbleEffect::Strong, u16::MAX);
        adapter.set_rumble_at_slot(pad.slot() + 1, RumbleEffect::Weak, 1);

        assert_eq!(adapter.pad(0), Some(&pad));
        assert_eq!(adapter.pads().count(), 1);
    }

    #[test]
    fn slot_exhaustion_leaves_port_unregistered_until_a_slot_frees() {
        let mut adapter = adapter(1);

        adapter.handle_packet(&packet([0x14, 0x14, 0x04, 0x04]));
        assert!(adapter.pad(0).is_some());
        assert!(adapter.pad(1).is_none());

        adapter.handle_packet(&packet([0x04, 0x14, 0x04, 0x04]));
        assert!(adapter.pad(0).is_none());
        assert_eq!(adapter.pad(1).map(|pad| pad.slot()), Some(0));
    }

    #[test]
    fn register_returns_none_without_vacancy() {
        let mut adapter = adapter(0);
        assert_eq!(adapter.register_pad(2), None);
        assert!(adapter.pad(2).is_none());
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut adapter = adapter(4);
        let events = recorded(&mut adapter);

        adapter.unregister_pad(3);
        adapter.handle_packet(&packet([0x04, 0x04, 0x04, 0x14]));
        adapter.unregister_pad(3);
        adapter.unregister_pad(3);

        assert_eq!(events.lock().unwrap().len(), 2);
        assert_eq!(adapter.slot_table().connected_count(), 0);
    }

    #[test]
    fn packet_payload_reaches_pad() {
        let mut adapter = adapter(4);
        let mut buf = packet([0x04, 0x04, 0x14, 0x04]);
        // Port 2 block starts at offset 19: pressed bits at +3/+4, axes at +5..+8.
        buf[19 + 3] = 0x00;
        buf[19 + 4] = 0x08;
        buf[19 + 5] = 0x80;
        buf[19 + 6] = 0x81;
        adapter.handle_packet(&buf);

        let slot = adapter.pad(2).unwrap().slot();
        assert_eq!(adapter.buttons_at_slot(slot), ButtonMask::from(JoypadButton::L));
        assert_eq!(adapter.axis_at_slot(slot, 0), 0);
        assert_eq!(adapter.axis_at_slot(slot, 1), 0x0100);
        assert_eq!(adapter.buttons_at_slot(slot + 1), ButtonMask::NONE);
        assert_eq!(adapter.axis_at_slot(slot + 1, 1), 0);
    }

    #[test]
    fn poll_once_reads_and_processes() {
        let mut adapter = adapter(4);
        adapter
            .transport
            .reads
            .push_back(Ok(packet([0x14, 0x14, 0x04, 0x04])));

        assert!(adapter.poll_once().unwrap());
        assert_eq!(adapter.pads().count(), 2);
        assert!(!adapter.poll_once().unwrap());

        adapter
            .transport
            .reads
            .push_back(Err(TransportError::Usb(rusb::Error::NoDevice)));
        assert!(adapter.poll_once().is_err());
    }

    #[test]
    fn destroy_disconnects_all_ports() {
        let mut adapter = adapter(4);
        let events = recorded(&mut adapter);
        adapter.handle_packet(&packet([0x14, 0x04, 0x14, 0x04]));

        adapter.destroy();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[2], PadEvent::Disconnected { port: 0, .. }));
        assert!(matches!(events[3], PadEvent::Disconnected { port: 2, .. }));
    }

    #[test]
    fn offline_adapter_ignores_packets() {
        let mut adapter = adapter(4);
        adapter.shutdown();
        adapter.handle_packet(&packet([0x14, 0x14, 0x14, 0x14]));
        assert_eq!(adapter.pads().count(), 0);
        assert_eq!(adapter.state().status(0), Some(PortStatus::Empty));
    }

    #[test]
    fn detects_nintendo_adapter_only() {
        type Adapter = GcaAdapter<FakeTransport, PadList>;
        assert!(<Adapter as HidDevice>::detect(0x057e, 0x0337));
        assert!(!<Adapter as HidDevice>::detect(0x057e, 0x0306));
    }
}
