use std::env;
use std::process;
use std::sync::Arc;

use envconfig::Envconfig;
use log::{error, info};

use rssi_probe::config::USAGE;
use rssi_probe::{transport, Config, Handshake, MoteIf, PacketSender, ReplyRecorder, Settings};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match Settings::init_from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("invalid environment: {}", e);
            process::exit(1);
        }
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let config = match Config::from_args(args.as_slice(), &settings) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };
    info!(
        "probing node {} via {}: {} packets with command id {}, writing to {}",
        config.node_id,
        config.source,
        u64::from(config.packet_count) + 1,
        config.command_id,
        config.output.display()
    );

    let connection = match transport::open(&config.source) {
        Ok(connection) => connection,
        Err(e) => {
            error!("could not connect to {}: {}", config.source, e);
            process::exit(1);
        }
    };

    let mote = match MoteIf::new(connection, config.group) {
        Ok(mote) => Arc::new(mote),
        Err(e) => {
            error!("could not start reading from {}: {}", config.source, e);
            process::exit(1);
        }
    };
    let handshake = Arc::new(Handshake::new(0));
    mote.register_listener(
        config.am_type,
        ReplyRecorder::new(&config.output, Arc::clone(&handshake)),
    );

    let sender = PacketSender::new(mote, handshake, config.dest, config.am_type);
    // Send failures end the run; the exit status stays 0.
    if let Err(e) = sender.send_packets(config.packet_count, config.command_id) {
        error!("probe aborted: {}", e);
    }
    process::exit(0);
}
