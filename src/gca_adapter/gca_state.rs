/// Number of controller ports on the adapter.
pub const PORT_COUNT: usize = 4;
/// Bytes per port: one status byte followed by the 8-byte payload.
pub const PORT_STRIDE: usize = 9;
/// One reserved header byte plus the four port blocks.
pub const STATE_LEN: usize = 1 + PORT_COUNT * PORT_STRIDE;

const STATUS_INITIALIZING: u8 = 0x00;
const STATUS_EMPTY: u8 = 0x04;
const STATUS_CONNECTED: u8 = 0x14;

/// Connection status reported for a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Initializing,
    Empty,
    Connected,
    Unknown(u8),
}

impl PortStatus {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            STATUS_INITIALIZING => PortStatus::Initializing,
            STATUS_EMPTY => PortStatus::Empty,
            STATUS_CONNECTED => PortStatus::Connected,
            other => PortStatus::Unknown(other),
        }
    }
}

/// Raw state blob as last delivered by the adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcaState {
    buf: [u8; STATE_LEN],
}

impl Default for GcaState {
    fn default() -> Self {
        Self {
            buf: [0; STATE_LEN],
        }
    }
}

impl GcaState {
    /// Copy an inbound read into the state buffer.
    ///
    /// Buffers longer than [`STATE_LEN`] are rejected and leave the state untouched.
    /// Shorter buffers overwrite only their own prefix.
    pub fn update(&mut self, buf: &[u8]) -> bool {
        match self.buf.get_mut(..buf.len()) {
            Some(prefix) => {
                prefix.copy_from_slice(buf);
                true
            }
            None => false,
        }
    }

    pub fn status(&self, port: usize) -> Option<PortStatus> {
        self.buf
            .get(status_offset(port)?)
            .map(|byte| PortStatus::from_byte(*byte))
    }

    /// The 9-byte slice for a port, starting at its status byte.
    pub fn port_slice(&self, port: usize) -> Option<&[u8]> {
        let start = status_offset(port)?;
        self.buf.get(start..start + PORT_STRIDE)
    }
}

fn status_offset(port: usize) -> Option<usize> {
    (port < PORT_COUNT).then(|| 1 + port * PORT_STRIDE)
}
