use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Connection lifecycle shared by both WebSocket transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TransportState {
    Idle = 0,
    Connecting = 1,
    Open = 2,
    Closed = 3,
}

impl TransportState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TransportState::Idle,
            1 => TransportState::Connecting,
            2 => TransportState::Open,
            _ => TransportState::Closed,
        }
    }
}

/// Shared state cell for a transport and its pump task
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TransportState::Idle as u8)))
    }

    pub fn set(&self, state: TransportState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> TransportState {
        TransportState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn is_open(&self) -> bool {
        self.get() == TransportState::Open
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cell_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), TransportState::Idle);
        assert!(!cell.is_open());

        cell.set(TransportState::Connecting);
        cell.set(TransportState::Open);
        assert!(cell.is_open());

        cell.set(TransportState::Closed);
        assert!(!cell.is_open());
    }

    #[test]
    fn test_state_roundtrips_through_the_atomic() {
        for state in [
            TransportState::Idle,
            TransportState::Connecting,
            TransportState::Open,
            TransportState::Closed,
        ] {
            let cell = StateCell::new();
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn test_clones_share_state() {
        let cell = StateCell::new();
        let view = cell.clone();
        cell.set(TransportState::Open);
        assert!(view.is_open());
    }
}
