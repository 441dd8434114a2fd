mod mote;

use std::fs;
use std::net::TcpListener;
use std::process::{Command, Output};

use mote::{Link, TcpMote};
use rstest::rstest;
use tempfile::TempDir;

fn rssi_probe(args: &[&str], output: &std::path::Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rssi-probe"))
        .args(args)
        .env("RSSI_PROBE_OUTPUT", output)
        .env_remove("MOTECOM")
        .output()
        .unwrap()
}

#[rstest]
#[case(&[])]
#[case(&["-comm", "/dev/ttyUSB0", "2", "20"])]
#[case(&["-comm", "/dev/ttyUSB0", "2", "20", "7", "8"])]
#[case(&["-serial", "/dev/ttyUSB0", "2", "20", "7"])]
#[case(&["-comm", "/dev/ttyUSB0", "two", "20", "7"])]
fn malformed_command_line_prints_usage(#[case] args: &[&str]) {
    let dir = TempDir::new().unwrap();
    let result = rssi_probe(args, &dir.path().join("pipe"));

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("usage: rssi-probe -comm"), "stderr: {}", stderr);
}

#[test]
fn probe_run_records_last_reply() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("pipe");
    let mote = TcpMote::spawn(Link::Framed, [50, 0, 0, 0], 3);

    let source = mote.source();
    let result = rssi_probe(&["-comm", &source, "2", "20", "7"], &output);

    assert_eq!(result.status.code(), Some(0));
    assert_eq!(mote.join().len(), 3);
    assert_eq!(fs::read_to_string(&output).unwrap(), "5");
}

#[test]
fn unreachable_gateway_fails() {
    let dir = TempDir::new().unwrap();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let source = format!("sf@127.0.0.1:{}", port);
    let result = rssi_probe(&["-comm", &source, "0", "20", "7"], &dir.path().join("pipe"));
    assert_eq!(result.status.code(), Some(1));
}
