//! In-process byte channel standing in for a real transport.
//!
//! Unbounded `std::sync::mpsc` underneath, with non-blocking helpers so the
//! simulation can drain it at the start of a tick.

use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Clone)]
pub struct Tx(Sender<Vec<u8>>);
pub struct Rx(Receiver<Vec<u8>>);

#[must_use]
pub fn channel() -> (Tx, Rx) {
    let (s, r) = mpsc::channel();
    (Tx(s), Rx(r))
}

impl Tx {
    /// Returns false once the receiving side is gone.
    #[must_use]
    pub fn try_send(&self, packet: Vec<u8>) -> bool {
        self.0.send(packet).is_ok()
    }
}

impl Rx {
    #[must_use]
    pub fn try_recv(&self) -> Option<Vec<u8>> {
        self.0.try_recv().ok()
    }
}
