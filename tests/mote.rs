//! A simulated probe mote for the integration tests.
#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};

use rssi_probe::framing::{Deframer, Frame};
use rssi_probe::message::AM_RSSI_MSG;
use rssi_probe::{Message, RssiMsg, SerialPacket};

/// Address the simulated mote sends replies from.
pub const MOTE_ADDR: u16 = 7;

/// How packets travel between the probe and the mote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Serial framing, replies ask for an acknowledgement.
    Framed,
    /// Serial forwarder length prefixes.
    SerialForwarder,
}

/// Answers `expected` commands on `stream`, then returns the commands it received.
///
/// Every command is answered with its own command id and `fields`.
pub fn serve<S: Read + Write>(
    mut stream: S,
    link: Link,
    fields: [u8; 4],
    expected: usize,
) -> Vec<RssiMsg> {
    if link == Link::SerialForwarder {
        stream.write_all(b"U ").unwrap();
        let mut version = [0u8; 2];
        read_exact(&mut stream, &mut version);
        assert_eq!(version, *b"U ");
    }

    let mut deframer = Deframer::new();
    let mut commands = Vec::new();
    let mut seq = 0u8;
    while commands.len() < expected {
        let packet = match link {
            Link::Framed => next_framed_packet(&mut stream, &mut deframer),
            Link::SerialForwarder => {
                let mut len = [0u8; 1];
                read_exact(&mut stream, &mut len);
                let mut packet = vec![0u8; usize::from(len[0])];
                read_exact(&mut stream, &mut packet);
                packet
            }
        };

        let packet = SerialPacket::decode(&packet).unwrap();
        assert_eq!(packet.header.am_type, AM_RSSI_MSG);
        let command = RssiMsg::decode(&packet.payload).unwrap();
        commands.push(command);

        let reply = RssiMsg {
            cmd_id: command.cmd_id,
            fields,
            crc: 0,
        };
        let mut reply = SerialPacket::new(0xffff, 0, AM_RSSI_MSG, reply.encode()).unwrap();
        reply.header.src = MOTE_ADDR;
        let reply = reply.encode();

        match link {
            Link::Framed => {
                seq = seq.wrapping_add(1);
                let frame = Frame::Packet {
                    seq: Some(seq),
                    packet: reply,
                };
                stream.write_all(&frame.encode()).unwrap();
            }
            Link::SerialForwarder => {
                stream.write_all(&[reply.len() as u8]).unwrap();
                stream.write_all(&reply).unwrap();
            }
        }
        stream.flush().unwrap();
    }
    commands
}

fn next_framed_packet<S: Read>(stream: &mut S, deframer: &mut Deframer) -> Vec<u8> {
    loop {
        let mut byte = [0u8; 1];
        read_exact(stream, &mut byte);
        match deframer.push(byte[0]) {
            Some(Frame::Packet { packet, .. }) => return packet,
            // acknowledgements for our replies
            Some(_) | None => {}
        }
    }
}

// Serial ports time out while the line is idle.
fn read_exact<S: Read>(stream: &mut S, buf: &mut [u8]) {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => panic!("probe closed the link"),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => panic!("reading from probe failed: {}", e),
        }
    }
}

/// A simulated mote listening on a local TCP port.
pub struct TcpMote {
    addr: SocketAddr,
    link: Link,
    handle: JoinHandle<Vec<RssiMsg>>,
}

impl TcpMote {
    /// Starts a mote answering `expected` commands with `fields`.
    pub fn spawn(link: Link, fields: [u8; 4], expected: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            serve(stream, link, fields, expected)
        });
        TcpMote { addr, link, handle }
    }

    /// Source string reaching this mote.
    pub fn source(&self) -> String {
        match self.link {
            Link::Framed => format!("network@{}", self.addr),
            Link::SerialForwarder => format!("sf@{}", self.addr),
        }
    }

    /// Waits for the mote to answer all commands and returns them.
    pub fn join(self) -> Vec<RssiMsg> {
        self.handle.join().unwrap()
    }
}
