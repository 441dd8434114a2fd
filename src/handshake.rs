use crossbeam_channel::{Receiver, Sender};

/// Counting signal between the sender and the reply listener.
///
/// The sender [`acquire`](Handshake::acquire)s after each packet and the listener
/// [`release`](Handshake::release)s once per reply, which keeps at most one request in flight.
/// Each release is one buffered message on an unbounded channel. There is no timeout: a reply
/// that never arrives blocks the sender for good.
#[derive(Debug)]
pub struct Handshake {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Handshake {
    /// Creates a handshake holding `permits` releases.
    pub fn new(permits: usize) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handshake = Handshake { tx, rx };
        for _ in 0..permits {
            handshake.release();
        }
        handshake
    }

    /// Blocks until a release is available and consumes it.
    pub fn acquire(&self) {
        // Both ends live in `self`, so the channel never disconnects.
        let _ = self.rx.recv();
    }

    /// Adds one release, waking a blocked [`acquire`](Handshake::acquire).
    pub fn release(&self) {
        let _ = self.tx.send(());
    }

    /// Returns the number of releases not yet consumed.
    pub fn available(&self) -> usize {
        self.rx.len()
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Handshake::new(0)
    }
}
