//! omciscope command-line interface.
//!
//! Thin front end over `omciscope-core`: scan saved captures for OMCI
//! messages, sniff a live interface, and inject OMCI frames or OpenOLT
//! control RPCs into an OLT. Decoded records are printed as JSON; errors go
//! to stderr and a non-zero exit code signals failure.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use omciscope_core::{inject, CaptureContext, Config, InjectionKind, InjectionRequest};
use tokio_stream::StreamExt;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "omciscope", version)]
#[command(
    about = "OMCI analysis and injection toolkit for OpenOLT-attached ONUs",
    long_about = None,
    after_help = "Examples:\n  omciscope pcap scan capture.pcap\n  omciscope pcap list\n  omciscope live --iface eth0 --max 100\n  omciscope inject OMCI_GetRequest --olt 10.0.0.5:9191 --onu 1 --class 256"
)]
struct Cli {
    /// Configuration CSV (key,value pairs).
    #[arg(long, global = true, default_value = "config.csv")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on saved captures.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
    /// Sniff a live interface and stream decoded records as JSON lines.
    Live {
        /// Capture device; overrides the configuration.
        #[arg(long)]
        iface: Option<String>,

        /// BPF filter; overrides the configuration.
        #[arg(long)]
        filter: Option<String>,

        /// Stop after this many records.
        #[arg(long)]
        max: Option<usize>,
    },
    /// Send one OMCI frame or control RPC to an OLT.
    Inject {
        /// Injection type, e.g. OMCI_GetRequest or OLT_GetDeviceInfo.
        kind: String,

        /// OLT agent address, host:port.
        #[arg(long)]
        olt: String,

        /// Per-call deadline in seconds (wall-clock budget for stress runs).
        #[arg(long, default_value_t = 5)]
        timeout: u64,

        /// PON interface id.
        #[arg(long, default_value_t = 0)]
        intf: u32,

        /// ONU id on the PON interface.
        #[arg(long, default_value_t = 0)]
        onu: u32,

        /// Transaction id of the first frame.
        #[arg(long, default_value_t = 1)]
        tid: u16,

        /// Managed entity instance id.
        #[arg(long, default_value_t = 0)]
        instance: u16,

        /// Managed entity class id.
        #[arg(long, default_value_t = 0)]
        class: u16,

        /// Command count for MIB upload and stress runs.
        #[arg(long, default_value_t = 0)]
        commands: u32,

        /// Attribute list (name=value,...); client count for
        /// OMCI_StresstestMulti.
        #[arg(long, default_value = "")]
        attributes: String,

        /// Raw hex frame for OMCI_CustomMessage.
        #[arg(long, default_value = "")]
        message: String,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Scan a capture for OMCI messages and print them as JSON.
    Scan {
        /// File name under the pcap directory (.pcap appended if missing).
        file: Option<String>,

        /// BPF filter; overrides the configuration.
        #[arg(long)]
        filter: Option<String>,

        /// Pretty-print the JSON output.
        #[arg(long)]
        pretty: bool,

        /// Write the matched packets to this capture file afterwards.
        #[arg(long)]
        export: Option<String>,
    },
    /// List capture files under the pcap directory.
    List,
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config);

    let result = match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Scan {
                file,
                filter,
                pretty,
                export,
            } => cmd_scan(config, file, filter, pretty, export),
            PcapCommands::List => cmd_list(config),
        },
        Commands::Live { iface, filter, max } => cmd_live(config, iface, filter, max).await,
        Commands::Inject {
            kind,
            olt,
            timeout,
            intf,
            onu,
            tid,
            instance,
            class,
            commands,
            attributes,
            message,
        } => {
            cmd_inject(
                kind,
                InjectionRequest {
                    olt,
                    timeout_s: timeout,
                    intf_id: intf,
                    onu_id: onu,
                    tid,
                    instance_id: instance,
                    class_id: class,
                    commands,
                    attributes,
                    message,
                },
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn load_config(path: &Path) -> Config {
    match Config::from_csv_path(path) {
        Ok(config) => config,
        Err(err) => {
            warn!(%err, "using default configuration");
            Config::default()
        }
    }
}

fn cmd_scan(
    mut config: Config,
    file: Option<String>,
    filter: Option<String>,
    pretty: bool,
    export: Option<String>,
) -> Result<(), CliError> {
    if let Some(filter) = filter {
        config.filter = filter;
    }
    let ctx = CaptureContext::new(config);

    let records = ctx
        .scan_file(file.as_deref().unwrap_or_default())
        .map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("expected a capture under the pcap directory".to_string()),
            )
        })?;

    let json = if pretty {
        serde_json::to_string_pretty(&records)
    } else {
        serde_json::to_string(&records)
    }
    .map_err(|err| CliError::new(format!("JSON serialization failed: {err}"), None))?;
    println!("{json}");

    if let Some(export) = export {
        let (written, path) = ctx
            .export_ring(&export)
            .map_err(|err| CliError::new(err.to_string(), None))?;
        if written == 0 {
            eprintln!("No packets to write!");
        } else {
            eprintln!("Export successful! {written} packets written to {path}");
        }
    }
    Ok(())
}

fn cmd_list(config: Config) -> Result<(), CliError> {
    let mut files = Vec::new();
    collect_files(&config.pcap_dir, &config.pcap_dir, &mut files).map_err(|err| {
        CliError::new(
            format!("cannot list {}: {err}", config.pcap_dir.display()),
            Some("create the pcap directory or point --config elsewhere".to_string()),
        )
    })?;
    files.sort();
    for file in files {
        println!("{file}");
    }
    Ok(())
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            out.push(relative.display().to_string());
        }
    }
    Ok(())
}

async fn cmd_live(
    mut config: Config,
    iface: Option<String>,
    filter: Option<String>,
    max: Option<usize>,
) -> Result<(), CliError> {
    if let Some(iface) = iface {
        config.interface = iface;
    }
    if let Some(filter) = filter {
        config.filter = filter;
    }

    let ctx = Arc::new(CaptureContext::new(config));
    ctx.start_sniffer().map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("live capture usually needs CAP_NET_RAW or root".to_string()),
        )
    })?;
    let mut stream = ctx
        .live_stream()
        .ok_or_else(|| CliError::new("live queue unavailable", None))?;

    let mut printed = 0usize;
    loop {
        tokio::select! {
            record = stream.next() => {
                let Some(record) = record else { break };
                match serde_json::to_string(&record) {
                    Ok(json) => println!("{json}"),
                    Err(err) => warn!(%err, "skipping unserialisable record"),
                }
                printed += 1;
                if max.is_some_and(|max| printed >= max) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    ctx.stop_sniffer();
    Ok(())
}

async fn cmd_inject(kind: String, request: InjectionRequest) -> Result<(), CliError> {
    let Some(kind) = InjectionKind::parse(&kind) else {
        println!("Unknown Injection");
        return Ok(());
    };

    let result = inject(kind, &request).await;
    println!("{result}");
    Ok(())
}
