use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info};

use crate::message::{Measurement, RssiMsg};
use crate::mote_if::MessageListener;
use crate::Handshake;

/// Writes the measurement of each reply to the output file and releases the handshake.
///
/// The file is recreated for every measurement, so it always holds the latest one only. Replies
/// with a command id that carries no measurement leave it untouched.
#[derive(Debug)]
pub struct ReplyRecorder {
    output: PathBuf,
    handshake: Arc<Handshake>,
}

impl ReplyRecorder {
    /// Creates a recorder writing to `output`.
    pub fn new(output: impl Into<PathBuf>, handshake: Arc<Handshake>) -> Self {
        ReplyRecorder {
            output: output.into(),
            handshake,
        }
    }

    fn record(&self, reply: &RssiMsg) -> io::Result<()> {
        let measurement = match Measurement::from_reply(reply) {
            Some(measurement) => measurement,
            None => {
                debug!("reply with command id {} carries no measurement", reply.cmd_id);
                return Ok(());
            }
        };

        let mut file = File::create(&self.output)?;
        file.write_all(measurement.to_string().as_bytes())?;
        file.flush()?;
        debug!("wrote {:?} to {}", measurement, self.output.display());
        Ok(())
    }
}

impl MessageListener<RssiMsg> for ReplyRecorder {
    fn message_received(&mut self, _to: u16, reply: RssiMsg) {
        let _release = scopeguard::guard(Arc::clone(&self.handshake), |handshake| {
            handshake.release()
        });

        info!(
            "received reply: command id {}, first field {}",
            reply.cmd_id, reply.fields[0]
        );
        if let Err(e) = self.record(&reply) {
            error!("could not write {}: {}", self.output.display(), e);
        }
    }
}
