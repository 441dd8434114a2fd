//! Run configuration.
//!
//! The command line is `rssi-probe -comm <source> <packet-count> <command-id> <node-id>`; the
//! rest comes from the environment, see [`Settings`]. Both are folded into an immutable
//! [`Config`] once at startup.

use std::path::PathBuf;

use clap::Parser;
use envconfig::Envconfig;

use crate::source::Source;
use crate::{Error, ErrorKind, Result};

/// Printed to stderr when the command line is malformed.
pub const USAGE: &str = "usage: rssi-probe -comm <source> <packet-count> <command-id> <node-id>";

/// Literal first argument.
pub const COMM_FLAG: &str = "-comm";

/// Settings taken from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Envconfig)]
pub struct Settings {
    /// File each measurement is written to. On the testbed this is a named pipe.
    #[envconfig(from = "RSSI_PROBE_OUTPUT", default = "/home/gwho/myPipe")]
    pub output: PathBuf,

    /// Source used when the command line gives `-` or an empty source.
    #[envconfig(from = "MOTECOM")]
    pub motecom: Option<String>,

    /// Active message type of the command and reply messages.
    #[envconfig(from = "RSSI_PROBE_AM_TYPE", default = "10")]
    pub am_type: u8,

    /// Node address command packets are sent to.
    #[envconfig(from = "RSSI_PROBE_DEST", default = "0")]
    pub dest: u16,

    /// Active message group stamped on command packets.
    #[envconfig(from = "RSSI_PROBE_GROUP", default = "0")]
    pub group: u8,
}

#[derive(Debug, Parser)]
#[clap(
    name = "rssi-probe",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Operands {
    #[clap(allow_hyphen_values = true)]
    source: String,
    packet_count: u32,
    command_id: u8,
    node_id: u16,
}

/// Immutable parameters of one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Link to the base station mote.
    pub source: Source,
    /// One less than the number of packets to send.
    pub packet_count: u32,
    /// Command id carried by every packet.
    pub command_id: u8,
    /// Node under test. Only reported; packets go to [`Config::dest`].
    pub node_id: u16,
    /// Measurement output file.
    pub output: PathBuf,
    /// Active message type of the command and reply messages.
    pub am_type: u8,
    /// Node address command packets are sent to.
    pub dest: u16,
    /// Active message group stamped on command packets.
    pub group: u8,
}

impl Config {
    /// Builds the configuration from the arguments following the program name.
    ///
    /// Anything but exactly five arguments starting with `-comm` is an
    /// [`ErrorKind::InvalidInput`] error, as are operands that do not parse. A negative packet
    /// count is rejected too.
    pub fn from_args<S: AsRef<str>>(args: &[S], settings: &Settings) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(|arg| arg.as_ref()).collect();
        if args.len() != 5 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("expected 5 arguments, got {}", args.len()),
            ));
        }
        if args[0] != COMM_FLAG {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("expected {} as first argument, got '{}'", COMM_FLAG, args[0]),
            ));
        }

        let operands = Operands::try_parse_from(
            std::iter::once("rssi-probe").chain(args[1..].iter().copied()),
        )
        .map_err(|e| Error::new(ErrorKind::InvalidInput, e.to_string()))?;

        Ok(Config {
            source: Source::resolve(Some(operands.source.as_str()), settings.motecom.as_deref())?,
            packet_count: operands.packet_count,
            command_id: operands.command_id,
            node_id: operands.node_id,
            output: settings.output.clone(),
            am_type: settings.am_type,
            dest: settings.dest,
            group: settings.group,
        })
    }
}
