use std::time::Duration;

use log::debug;
use serialport::{DataBits, FlowControl, Parity, StopBits};

use super::{Connection, FramedReader, FramedWriter};
use crate::Result;

// Reads time out so a quiet line does not look like a hang-up; the reader simply polls again.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Opens a serial port with the 8N1 settings motes use.
pub(super) fn open(port: &str, baud_rate: u32) -> Result<Connection> {
    let serial = serialport::new(port, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()?;
    debug!("opened serial port {} at {} baud", port, baud_rate);

    let reader = FramedReader::new(serial.try_clone()?, Some(serial.try_clone()?));
    Ok(Connection::from_parts(
        format!("serial@{}:{}", port, baud_rate),
        reader,
        FramedWriter::new(serial),
    ))
}
