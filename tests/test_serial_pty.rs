mod mote;

use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use mote::Link;
use rssi_probe::message::{AM_RSSI_MSG, CMD_RSSI_ALT};
use rssi_probe::{transport, Handshake, MoteIf, PacketSender, ReplyRecorder, Source};
use tempfile::TempDir;

fn wait_for_file<P: AsRef<Path>>(path: P, timeout: Duration) -> Result<(), ()> {
    let end = SystemTime::now() + timeout;

    loop {
        if path.as_ref().exists() {
            return Ok(());
        }

        if SystemTime::now() > end {
            return Err(());
        }

        thread::sleep(Duration::from_millis(100));
    }
}

/// Probe a simulated mote sitting on the far end of a pseudo terminal pair.
#[test]
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), ignore)]
fn probe_over_pty() {
    // Create temp dir and pseudo terminal paths.
    let tmp_dir = TempDir::new().unwrap();
    let probe_pty = tmp_dir.path().join("ttyV0");
    let mote_pty = tmp_dir.path().join("ttyV1");
    let output = tmp_dir.path().join("pipe");

    let socat = Command::new("socat")
        .args([
            format!("PTY,link={},raw,echo=0,mode=700", probe_pty.display()),
            format!("PTY,link={},raw,echo=0,mode=700", mote_pty.display()),
        ])
        .spawn();
    let mut socat = match socat {
        Ok(socat) => socat,
        Err(e) => {
            eprintln!("skipping, socat is not available: {}", e);
            return;
        }
    };
    wait_for_file(&probe_pty, Duration::from_millis(1000)).unwrap();
    wait_for_file(&mote_pty, Duration::from_millis(1000)).unwrap();

    let mote_port = serialport::new(mote_pty.to_str().unwrap(), 115200)
        .timeout(Duration::from_millis(100))
        .open()
        .unwrap();
    let mote = thread::spawn(move || mote::serve(mote_port, Link::Framed, [40, 0, 0, 0], 2));

    let source: Source = format!("serial@{}:115200", probe_pty.display())
        .parse()
        .unwrap();
    let mote_if = Arc::new(MoteIf::new(transport::open(&source).unwrap(), 0).unwrap());
    let handshake = Arc::new(Handshake::new(0));
    mote_if.register_listener(
        AM_RSSI_MSG,
        ReplyRecorder::new(&output, Arc::clone(&handshake)),
    );
    let sent = PacketSender::new(mote_if, handshake, 0, AM_RSSI_MSG)
        .send_packets(1, CMD_RSSI_ALT)
        .unwrap();

    assert_eq!(sent, 2);
    assert_eq!(mote.join().unwrap().len(), 2);
    assert_eq!(fs::read_to_string(&output).unwrap(), "-5");

    // Release pseudo terminal pair (by terminating socat).
    socat.kill().unwrap();
    socat.wait().unwrap();
}
