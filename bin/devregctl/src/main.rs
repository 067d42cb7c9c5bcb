//! ---
//! devreg_section: "05-networking-external-interfaces"
//! devreg_subsection: "binary"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Control CLI for operators interacting with the device registry."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Parser, Subcommand};
use devreg_core::{DeviceRegistration, DeviceType};
use devreg_logging as logging;
use serde::Serialize;

mod client;

use client::RegistryClient;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Device registry control utility",
    long_about = None
)]
struct Cli {
    #[arg(
        long,
        env = "DEVREG_SERVER",
        default_value = "http://127.0.0.1:8080",
        help = "Base URL of the registry API"
    )]
    server: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Register a device")]
    Register {
        #[arg(help = "MAC address of the new device")]
        mac: String,
        #[arg(
            long = "type",
            value_name = "TYPE",
            help = "GATEWAY, SWITCH or ACCESS_POINT"
        )]
        device_type: DeviceType,
        #[arg(long, value_name = "MAC", help = "MAC address of the uplink device")]
        uplink: Option<String>,
    },
    #[command(about = "List devices, gateways first")]
    List,
    #[command(about = "Show a single device")]
    Get { mac: String },
    #[command(about = "Show the full topology, or the tree below one device")]
    Topology { mac: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let client = RegistryClient::new(&cli.server)?;

    match cli.command {
        Commands::Register {
            mac,
            device_type,
            uplink,
        } => {
            let mut registration = DeviceRegistration::new(device_type, mac);
            if let Some(uplink) = uplink {
                registration = registration.with_uplink(uplink);
            }
            print_json(&client.register(&registration).await?)?;
        }
        Commands::List => print_json(&client.list().await?)?,
        Commands::Get { mac } => print_json(&client.get(&mac).await?)?,
        Commands::Topology { mac: Some(mac) } => print_json(&client.subtree(&mac).await?)?,
        Commands::Topology { mac: None } => print_json(&client.forest().await?)?,
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
