//! Command-line probe for PTP/IP cameras.
//!
//! Usage:
//!   camlink-probe discover
//!   camlink-probe info <host> [--port PORT]
//!   camlink-probe list <host> [--port PORT]
//!   camlink-probe download <host> <handle> <out-file> [--port PORT]
//!   camlink-probe thumb <host> <handle> <out-file> [--port PORT]
//!
//! Results are printed to stdout as JSON, logs go to stderr (`RUST_LOG` controls
//! the level). Timeouts follow the `CAMLINK_*` environment variables.

use std::env;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use camlink::bridge::{BridgeError, NoopObserver};
use camlink::{CameraBridge, DEFAULT_PORT};
use serde::Serialize;

const USAGE: &str = "usage: camlink-probe <discover | info HOST | list HOST | download HOST HANDLE OUT | thumb HOST HANDLE OUT> [--port PORT]";

enum Command {
    Discover,
    Info { host: String },
    List { host: String },
    Download { host: String, handle: u32, out: String, thumbnail: bool },
}

/// Splits `--port PORT` off the arguments and parses the rest into a command.
fn parse_args(args: &[String]) -> Result<(Command, u16), String> {
    let mut port = DEFAULT_PORT;
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--port" {
            let value = iter.next().ok_or("--port needs a value")?;
            port = value.parse().map_err(|_| format!("invalid port: {value}"))?;
        } else {
            positional.push(arg.as_str());
        }
    }

    let handle = |value: &str| value.parse::<u32>().map_err(|_| format!("invalid handle: {value}"));
    let command = match positional.as_slice() {
        ["discover"] => Command::Discover,
        ["info", host] => Command::Info { host: host.to_string() },
        ["list", host] => Command::List { host: host.to_string() },
        [verb @ ("download" | "thumb"), host, h, out] => Command::Download {
            host: host.to_string(),
            handle: handle(*h)?,
            out: out.to_string(),
            thumbnail: *verb == "thumb",
        },
        _ => return Err(USAGE.to_string()),
    };
    Ok((command, port))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    writeln!(io::stdout(), "{json}").map_err(|e| e.to_string())
}

fn bridge_error(e: BridgeError) -> String {
    format!("{e}: {}", e.user_message())
}

/// Connects, runs `f`, and disconnects, all on a blocking thread.
async fn with_camera<T, F>(bridge: Arc<CameraBridge>, host: String, port: u16, f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&CameraBridge) -> Result<T, String> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = bridge.connect(&host, port);
        if !result.success {
            return Err(result.error.unwrap_or_else(|| "connection failed".to_string()));
        }
        let outcome = f(bridge.as_ref());
        bridge.disconnect();
        outcome
    })
    .await
    .map_err(|e| format!("worker thread failed: {e}"))?
}

async fn run(command: Command, port: u16) -> Result<(), String> {
    let bridge = Arc::new(CameraBridge::new(Arc::new(NoopObserver)));
    match command {
        Command::Discover => {
            let cameras = bridge
                .discover_cameras(|camera| {
                    log::info!("Found {} ({})", camera.socket_addr(), camera.method);
                })
                .await;
            print_json(&cameras)
        }
        Command::Info { host } => {
            let (info, storages) = with_camera(bridge, host, port, |b| {
                let info = b.get_camera_info().map_err(bridge_error)?;
                let storages = b.get_storage_info().map_err(bridge_error)?;
                Ok((info, storages))
            })
            .await?;
            print_json(&serde_json::json!({ "camera": info, "storages": storages }))
        }
        Command::List { host } => {
            let images = with_camera(bridge, host, port, |b| b.list_images().map_err(bridge_error)).await?;
            print_json(&images)
        }
        Command::Download {
            host,
            handle,
            out,
            thumbnail,
        } => {
            let bytes = with_camera(bridge, host, port, move |b| {
                let bytes = if thumbnail {
                    b.download_thumbnail(handle)
                } else {
                    b.download_image(handle)
                };
                bytes.map_err(bridge_error)
            })
            .await?;
            std::fs::write(&out, &bytes).map_err(|e| format!("couldn't write {out}: {e}"))?;
            print_json(&serde_json::json!({ "handle": handle, "bytes": bytes.len(), "path": out }))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (command, port) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match run(command, port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{message}");
            ExitCode::FAILURE
        }
    }
}
