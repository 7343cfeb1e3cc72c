//! Demo client: streams datagrams to the server and sends it a command every
//! cycle over the stream connection.
//!
//! Usage: `client [--config <path>]` or `client <path>`. Without a file the
//! client connects to `127.0.0.1:5006` and sends datagrams to `127.0.0.1:5005`.

mod link_client;

use std::env;

use log::info;
use nodelink::LinkSettings;

use crate::link_client::LinkClient;

const DEFAULT_SERVER: &str = "127.0.0.1:5006";
const DEFAULT_DATAGRAM_PEER: &str = "127.0.0.1:5005";

/// Looks for `--config <path>`, `-c <path>` or a leading positional path.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    args.get(1).filter(|arg| !arg.starts_with('-')).cloned()
}

fn main() -> nodelink::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match parse_config_path() {
        Some(path) => {
            info!("Using config: {}", path);
            LinkSettings::load(&path)?
        }
        // Ephemeral datagram port so a local server can keep 5005.
        None => LinkSettings {
            udp_bind: "0.0.0.0:0".to_string(),
            udp_peer: Some(DEFAULT_DATAGRAM_PEER.to_string()),
            tcp_peer: Some(DEFAULT_SERVER.to_string()),
            ..LinkSettings::default()
        },
    };

    let mut client = LinkClient::new(settings.into_config()?)?;
    client.run()
}
