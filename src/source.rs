//! Gateway source strings.
//!
//! A source names the link to the base station mote:
//!
//! | Source | Link |
//! |--------|------|
//! | `serial@<port>[:<rate>]` | serial port, `rate` is a baud rate or a platform name |
//! | `network@<host>:<port>` | framed serial stream over TCP |
//! | `sf@<host>:<port>` | serial forwarder |
//! | `<port>` | serial port at [`DEFAULT_BAUD_RATE`] |

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// Source used when none is given and `MOTECOM` is not set.
pub const DEFAULT_SOURCE: &str = "sf@localhost:9002";

/// Baud rate for serial sources without an explicit rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates of the mote platforms that may appear in place of a numeric rate.
const PLATFORM_BAUD_RATES: &[(&str, u32)] = &[
    ("telos", 115_200),
    ("telosb", 115_200),
    ("tmote", 115_200),
    ("micaz", 57_600),
    ("mica2", 57_600),
    ("mica2dot", 19_200),
    ("iris", 57_600),
    ("eyesIFX", 57_600),
    ("intelmote2", 115_200),
    ("tinynode", 115_200),
    ("shimmer", 115_200),
    ("epic", 115_200),
];

/// Looks up the baud rate of a mote platform.
pub fn platform_baud_rate(platform: &str) -> Option<u32> {
    PLATFORM_BAUD_RATES
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|&(_, rate)| rate)
}

/// A parsed gateway source.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Source {
    /// A serial port.
    Serial {
        /// Port name, e.g. `/dev/ttyUSB0` or `COM3`.
        port: String,
        /// Baud rate.
        baud_rate: u32,
    },
    /// The framed serial byte stream carried over a TCP connection.
    Network {
        /// Host to connect to.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// A serial forwarder.
    SerialForwarder {
        /// Host to connect to.
        host: String,
        /// TCP port.
        port: u16,
    },
}

impl Source {
    /// Picks the source for a run.
    ///
    /// `explicit` wins unless it is empty or `-`, which both mean "none given". Then `motecom`
    /// is tried, and finally [`DEFAULT_SOURCE`].
    pub fn resolve(explicit: Option<&str>, motecom: Option<&str>) -> Result<Self> {
        let given = |s: &&str| !s.is_empty() && *s != "-";
        explicit
            .filter(given)
            .or_else(|| motecom.filter(given))
            .unwrap_or(DEFAULT_SOURCE)
            .parse()
    }
}

fn host_and_port(source: &str, spec: &str) -> Result<(String, u16)> {
    let (host, port) = spec.rsplit_once(':').ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("source {} lacks a port (expected <host>:<port>)", source),
        )
    })?;
    if host.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("source {} lacks a host", source),
        ));
    }
    let port = port.parse().map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("invalid TCP port '{}' in source {}", port, source),
        )
    })?;
    Ok((host.to_string(), port))
}

fn serial(source: &str, spec: &str) -> Result<Source> {
    let (port, baud_rate) = match spec.rsplit_once(':') {
        Some((port, rate)) => {
            let baud_rate = rate
                .parse()
                .ok()
                .or_else(|| platform_baud_rate(rate))
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidInput,
                        format!("unknown baud rate or platform '{}' in source {}", rate, source),
                    )
                })?;
            (port, baud_rate)
        }
        None => (spec, DEFAULT_BAUD_RATE),
    };
    if port.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("source {} lacks a port name", source),
        ));
    }
    Ok(Source::Serial {
        port: port.to_string(),
        baud_rate,
    })
}

impl FromStr for Source {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self> {
        match source.split_once('@') {
            Some(("serial", spec)) => serial(source, spec),
            Some(("network", spec)) => {
                let (host, port) = host_and_port(source, spec)?;
                Ok(Source::Network { host, port })
            }
            Some(("sf", spec)) => {
                let (host, port) = host_and_port(source, spec)?;
                Ok(Source::SerialForwarder { host, port })
            }
            Some((kind, _)) => Err(Error::new(
                ErrorKind::InvalidInput,
                format!("unknown source type '{}' in {}", kind, source),
            )),
            None if source.is_empty() => {
                Err(Error::new(ErrorKind::InvalidInput, "empty source"))
            }
            None => Ok(Source::Serial {
                port: source.to_string(),
                baud_rate: DEFAULT_BAUD_RATE,
            }),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Serial { port, baud_rate } => write!(f, "serial@{}:{}", port, baud_rate),
            Source::Network { host, port } => write!(f, "network@{}:{}", host, port),
            Source::SerialForwarder { host, port } => write!(f, "sf@{}:{}", host, port),
        }
    }
}
