//! Demo stream server: accepts one client, logs datagrams and acknowledges
//! every stream message.
//!
//! Usage: `server [--config <path>]` or `server <path>`. Without a file the
//! server listens on `0.0.0.0:5006` and receives datagrams on `0.0.0.0:5005`.

mod link_server;

use std::env;

use log::info;
use nodelink::LinkSettings;

use crate::link_server::LinkServer;

const DEFAULT_LISTEN: &str = "0.0.0.0:5006";

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
        None => LinkSettings {
            tcp_listen: Some(DEFAULT_LISTEN.to_string()),
            ..LinkSettings::default()
        },
    };

    let mut server = LinkServer::new(settings.into_config()?)?;
    server.run()
}
