use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use log::{debug, error, trace, warn};

use crate::message::{AmHeader, Message, SerialPacket};
use crate::transport::{Connection, PacketReader, PacketWriter};
use crate::Result;

/// Receives messages of one type from a [`MoteIf`].
///
/// Listeners run on the dispatch thread, one message at a time.
pub trait MessageListener<M>: Send {
    /// Called for every message addressed to `to` that decoded as `M`.
    fn message_received(&mut self, to: u16, message: M);
}

type Dispatch = Box<dyn FnMut(&AmHeader, &[u8]) + Send>;
type Listeners = Arc<Mutex<HashMap<u8, Vec<Dispatch>>>>;

fn lock(listeners: &Listeners) -> MutexGuard<'_, HashMap<u8, Vec<Dispatch>>> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends messages to motes and dispatches incoming ones to registered listeners.
///
/// Creating a `MoteIf` starts a dispatch thread that reads packets from the connection until it
/// fails or the process exits.
pub struct MoteIf {
    name: String,
    group: u8,
    writer: Mutex<Box<dyn PacketWriter>>,
    listeners: Listeners,
}

impl MoteIf {
    /// Takes over `connection`, stamping outgoing packets with `group`.
    ///
    /// Fails if the dispatch thread cannot be started.
    pub fn new(connection: Connection, group: u8) -> Result<Self> {
        let Connection {
            name,
            reader,
            writer,
        } = connection;
        let listeners: Listeners = Arc::default();

        let dispatch_listeners = Arc::clone(&listeners);
        let dispatch_name = name.clone();
        thread::Builder::new()
            .name("mote-if-dispatch".into())
            .spawn(move || dispatch(reader, &dispatch_listeners, &dispatch_name))?;

        Ok(MoteIf {
            name,
            group,
            writer: Mutex::new(writer),
            listeners,
        })
    }

    /// Delivers every incoming message with active message type `am_type` to `listener`.
    ///
    /// Must not be called from inside a listener.
    pub fn register_listener<M, L>(&self, am_type: u8, mut listener: L)
    where
        M: Message + 'static,
        L: MessageListener<M> + 'static,
    {
        let dispatch: Dispatch = Box::new(move |header: &AmHeader, payload: &[u8]| {
            match M::decode(payload) {
                Ok(message) => listener.message_received(header.dest, message),
                Err(e) => warn!(
                    "dropping message of type {} from node {}: {}",
                    header.am_type, header.src, e
                ),
            }
        });
        lock(&self.listeners)
            .entry(am_type)
            .or_default()
            .push(dispatch);
        debug!("registered listener for active message type {}", am_type);
    }

    /// Sends `message` to node `dest` as active message type `am_type`.
    pub fn send<M: Message>(&self, dest: u16, am_type: u8, message: &M) -> Result<()> {
        let packet = SerialPacket::new(dest, self.group, am_type, message.encode())?;
        let bytes = packet.encode();
        trace!("sending {:02x?} to {}", bytes, self.name);
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_packet(&bytes)
    }

    /// Returns the name of the underlying connection.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for MoteIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoteIf")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

fn dispatch(mut reader: Box<dyn PacketReader>, listeners: &Listeners, name: &str) {
    loop {
        let bytes = match reader.read_packet() {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("stopped reading from {}: {}", name, e);
                return;
            }
        };
        trace!("received {:02x?} from {}", bytes, name);

        let packet = match SerialPacket::decode(&bytes) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("dropping packet from {}: {}", name, e);
                continue;
            }
        };

        let mut listeners = lock(listeners);
        match listeners.get_mut(&packet.header.am_type) {
            Some(registered) => {
                for listener in registered.iter_mut() {
                    listener(&packet.header, &packet.payload);
                }
            }
            None => debug!(
                "no listener for active message type {} from node {}",
                packet.header.am_type, packet.header.src
            ),
        }
    }
}
