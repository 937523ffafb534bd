/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod config;
pub mod exitcode;
pub mod host;
pub mod utils;

use std::io::Write;
use std::path::PathBuf;

use clap::error::{ContextKind, ContextValue};
use clap::{Arg, ArgMatches, Command};

use config::MeshConfig;
use host::MeshHostInterface;

const VERSION_MAJOR: u32 = 0;
const VERSION_MINOR: u32 = 1;
const VERSION_REVISION: u32 = 0;

fn make_help() -> String {
    format!(
        r###"mesh-service {}.{}.{}
Distance-vector mesh routing core and shared-memory ring buffer service.

Usage: mesh-service [-...] <command> [command args]

Global Options:

  -p <path>                                Use alternate config directory

Commands:

  help                                     Show this help
  version                                  Print version
  run                                      Start the routing service
  status                                   Show local node status

"###,
        VERSION_MAJOR, VERSION_MINOR, VERSION_REVISION,
    )
}

pub fn print_help() {
    let h = make_help();
    let _ = std::io::stdout().write_all(h.as_bytes());
}

#[cfg(target_os = "macos")]
pub fn platform_default_config_path() -> String {
    "/Library/Application Support/mesh-service/config.toml".into()
}

#[cfg(target_os = "linux")]
pub fn platform_default_config_path() -> String {
    "/etc/mesh-service/config.toml".into()
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub fn platform_default_config_path() -> String {
    "mesh-service.toml".into()
}

pub struct Flags {
    pub config_path: PathBuf,
}

async fn run_service(cfg: MeshConfig) -> i32 {
    let local_node_id = match cfg.local_node_id_parsed() {
        Ok(id) => mesh_core::NodeId(id),
        Err(_) => {
            eprintln!("invalid local_node_id in configuration");
            return exitcode::ERR_CONFIG;
        }
    };

    let (tx_transport, _rx_transport) = mesh_rbbq::LoopbackTransport::pair(cfg.buf_data_size);
    let buffer = std::sync::Arc::new(mesh_rbbq::Rbbq::new("mesh0", tx_transport));
    if buffer.init().is_err() || buffer.start().is_err() {
        eprintln!("FATAL: failed to bring up local buffer");
        return exitcode::ERR_IOERR;
    }

    let mut host = host::MeshHost::new(local_node_id, cfg.node_count, buffer);
    log::info!("mesh-service running as node {:#x}, table capacity {}", local_node_id.0, host.table.capacity());

    // Loopback self-heartbeat: proves the routing core, port abstraction,
    // and buffer plumbing are wired together correctly at startup.
    let neighbour_id = mesh_core::NodeId(local_node_id.0.wrapping_add(1));
    let now_ms = host.clock().now_ms();
    let ports: Vec<&dyn mesh_core::port::Port> = vec![&host.port];
    if let Err(e) = host.table.neighbour_update(0, neighbour_id, mesh_core::PROTOCOL_VERSION, 5, 0, 0, &ports, now_ms) {
        if e.is_soft() {
            log::debug!("startup self-check heartbeat rejected: {}", e);
        } else {
            log::warn!("startup self-check heartbeat rejected: {}", e);
        }
    }

    tokio::signal::ctrl_c().await.ok();
    println!("Terminate signal received, shutting down...");
    exitcode::OK
}

async fn async_main(flags: Flags, global_args: Box<ArgMatches>) -> i32 {
    let cfg = match MeshConfig::load(&flags.config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: failed to load configuration: {}", e);
            return exitcode::ERR_CONFIG;
        }
    };

    match global_args.subcommand() {
        Some(("help", _)) => {
            print_help();
            exitcode::OK
        }
        Some(("version", _)) => {
            println!("{}.{}.{}", VERSION_MAJOR, VERSION_MINOR, VERSION_REVISION);
            exitcode::OK
        }
        Some(("status", _)) => {
            println!("local_node_id = {}", cfg.local_node_id);
            println!("node_count = {}", cfg.node_count);
            println!("buf_count = {}", cfg.buf_count);
            exitcode::OK
        }
        Some(("run", _)) => run_service(cfg).await,
        _ => {
            eprintln!("Invalid command line. Use 'help' for help.");
            exitcode::ERR_USAGE
        }
    }
}

fn main() {
    env_logger::init();

    let global_args = Box::new({
        let help = make_help();
        Command::new("mesh-service")
            .arg(Arg::new("path").short('p').takes_value(true))
            .subcommand_required(true)
            .subcommand(Command::new("help"))
            .subcommand(Command::new("version"))
            .subcommand(Command::new("status"))
            .subcommand(Command::new("run"))
            .override_help(help.as_str())
            .override_usage("")
            .disable_version_flag(true)
            .disable_help_subcommand(false)
            .disable_help_flag(true)
            .try_get_matches_from(std::env::args())
            .unwrap_or_else(|e| {
                if e.kind() == clap::ErrorKind::DisplayHelp || e.kind() == clap::ErrorKind::MissingSubcommand {
                    print_help();
                    std::process::exit(exitcode::OK);
                } else {
                    let mut invalid = String::default();
                    let mut suggested = String::default();
                    for c in e.context() {
                        match c {
                            (ContextKind::SuggestedSubcommand | ContextKind::SuggestedArg, ContextValue::String(name)) => {
                                suggested = name.clone();
                            }
                            (ContextKind::InvalidArg | ContextKind::InvalidSubcommand, ContextValue::String(name)) => {
                                invalid = name.clone();
                            }
                            _ => {}
                        }
                    }
                    if invalid.is_empty() {
                        eprintln!("Invalid command line. Use 'help' for help.");
                    } else if suggested.is_empty() {
                        eprintln!("Unrecognized option '{}'. Use 'help' for help.", invalid);
                    } else {
                        eprintln!("Unrecognized option '{}', did you mean {}? Use 'help' for help.", invalid, suggested);
                    }
                    std::process::exit(exitcode::ERR_USAGE);
                }
            })
    });

    let flags =
        Flags { config_path: global_args.value_of("path").map_or_else(|| PathBuf::from(platform_default_config_path()), PathBuf::from) };

    std::process::exit(tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap().block_on(async_main(flags, global_args)));
}
