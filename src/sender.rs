use std::sync::Arc;

use log::{debug, error, info};

use crate::message::RssiMsg;
use crate::{Handshake, MoteIf, Result};

/// Sends command packets one at a time, waiting for each reply before the next packet.
#[derive(Debug)]
pub struct PacketSender {
    mote: Arc<MoteIf>,
    handshake: Arc<Handshake>,
    dest: u16,
    am_type: u8,
}

impl PacketSender {
    /// Creates a sender addressing node `dest` with active message type `am_type`.
    pub fn new(mote: Arc<MoteIf>, handshake: Arc<Handshake>, dest: u16, am_type: u8) -> Self {
        PacketSender {
            mote,
            handshake,
            dest,
            am_type,
        }
    }

    /// Sends `count + 1` packets carrying `command_id`.
    ///
    /// Each send is followed by a wait on the handshake, so this returns only after the reply
    /// to the last packet was handled. The first failed send aborts the run and is returned;
    /// nothing is retried. Returns the number of packets sent.
    pub fn send_packets(&self, count: u32, command_id: u8) -> Result<u64> {
        let total = u64::from(count) + 1;
        let mut payload = RssiMsg::default();

        for sent in 0..total {
            payload.set_cmd_id(command_id);
            if let Err(e) = self.mote.send(self.dest, self.am_type, &payload) {
                error!(
                    "sending packet {} of {} over {} failed, giving up: {}",
                    sent + 1,
                    total,
                    self.mote.name(),
                    e
                );
                return Err(e);
            }
            debug!("sent packet {} of {}, waiting for reply", sent + 1, total);
            self.handshake.acquire();
        }

        info!("sent {} packets with command id {}", total, command_id);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, SerialPacket};
    use crate::transport::{Connection, PacketReader, PacketWriter};
    use crate::{Error, ErrorKind};
    use std::sync::mpsc::{self, Receiver, Sender};

    /// Plays the mote: every packet written is answered by a release of the handshake.
    struct EchoWriter {
        sent: Sender<RssiMsg>,
        handshake: Arc<Handshake>,
        fail_after: Option<usize>,
        writes: usize,
    }

    impl PacketWriter for EchoWriter {
        fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
            if self.fail_after == Some(self.writes) {
                return Err(Error::new(ErrorKind::NoDevice, "unplugged"));
            }
            self.writes += 1;
            let packet = SerialPacket::decode(packet)?;
            self.sent.send(RssiMsg::decode(&packet.payload)?).unwrap();
            self.handshake.release();
            Ok(())
        }
    }

    struct Silent;

    impl PacketReader for Silent {
        fn read_packet(&mut self) -> Result<Vec<u8>> {
            Err(Error::new(ErrorKind::Disconnected, "no replies here"))
        }
    }

    fn sender(fail_after: Option<usize>) -> (PacketSender, Receiver<RssiMsg>) {
        let handshake = Arc::new(Handshake::new(0));
        let (sent, log) = mpsc::channel();
        let writer = EchoWriter {
            sent,
            handshake: Arc::clone(&handshake),
            fail_after,
            writes: 0,
        };
        let mote =
            MoteIf::new(Connection::from_parts("echo", Silent, writer), 0).unwrap();
        (PacketSender::new(Arc::new(mote), handshake, 0, 10), log)
    }

    #[test]
    fn sends_count_plus_one_packets() {
        let (sender, log) = sender(None);
        assert_eq!(sender.send_packets(2, 20).unwrap(), 3);

        let sent: Vec<RssiMsg> = log.try_iter().collect();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|msg| msg.cmd_id == 20));
    }

    #[test]
    fn zero_count_still_sends_once() {
        let (sender, log) = sender(None);
        assert_eq!(sender.send_packets(0, 22).unwrap(), 1);
        assert_eq!(log.try_iter().count(), 1);
    }

    #[test]
    fn send_failure_aborts_remaining_packets() {
        let (sender, log) = sender(Some(1));
        let err = sender.send_packets(5, 21).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoDevice);
        assert_eq!(log.try_iter().count(), 1);
    }
}
