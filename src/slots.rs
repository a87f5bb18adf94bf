/// The host's device-slot table: one entry per logical input device.
///
/// Allocation and release are expected to be serialized by the implementor.
pub trait SlotTable {
    /// Reserve a vacant slot, or `None` when the table is full.
    fn find_vacant(&mut self) -> Option<usize>;

    fn mark_connected(&mut self, slot: usize);

    fn mark_disconnected(&mut self, slot: usize);

    fn is_connected(&self, slot: usize) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum SlotEntry {
    #[default]
    Vacant,
    Reserved,
    Connected,
}

/// Fixed-capacity in-memory slot table.
#[derive(Debug, Clone)]
pub struct PadList {
    entries: Vec<SlotEntry>,
}

impl PadList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![SlotEntry::Vacant; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn connected_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| **entry == SlotEntry::Connected)
            .count()
    }
}

impl SlotTable for PadList {
    fn find_vacant(&mut self) -> Option<usize> {
        let slot = self
            .entries
            .iter()
            .position(|entry| *entry == SlotEntry::Vacant)?;
        self.entries[slot] = SlotEntry::Reserved;
        Some(slot)
    }

    fn mark_connected(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SlotEntry::Connected;
        }
    }

    fn mark_disconnected(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = SlotEntry::Vacant;
        }
    }

    fn is_connected(&self, slot: usize) -> bool {
        self.entries.get(slot) == Some(&SlotEntry::Connected)
    }
}
