//! Offline replay of captured manager command outputs.
//!
//! Feeds saved `core show channels verbose`, `queue show` and `sip show peers`
//! outputs through the same parsers the orchestrator uses and prints the
//! aggregated view as JSON. Handy when a switch upgrade changes the listing
//! format and the dashboard starts showing nonsense.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use rvoip_ami_monitor::logging::{parse_log_level, setup_logging, LoggingConfig};
use rvoip_ami_monitor::model::{AgentStatus, CallPair, QueueSummary, StateTotals};
use rvoip_ami_monitor::parser::{self, PeerTable};
use rvoip_ami_monitor::{correlate, MonitorConfig};

/// Replay captured AMI command outputs and print the aggregated state
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output of `queue show` (one or many queues)
    #[arg(short, long)]
    queues: PathBuf,

    /// Output of `core show channels verbose`
    #[arg(short, long)]
    channels: Option<PathBuf>,

    /// Output of `sip show peers`
    #[arg(short, long)]
    peers: Option<PathBuf>,

    /// Only report this extension
    #[arg(short, long)]
    extension: Option<String>,

    /// Monitor configuration (TOML) supplying parser settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Channel technology prefix, overrides the configuration
    #[arg(long)]
    prefix: Option<String>,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Include source file and line in log lines
    #[arg(long)]
    log_locations: bool,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Replay {
    agents: Vec<AgentStatus>,
    queues: Vec<QueueSummary>,
    totals: StateTotals,
    calls_waiting: u64,
    call_pairs: Vec<CallPair>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut logging = LoggingConfig::new(parse_log_level(&args.log_level)?, "ami-snapshot");
    if args.json_logs {
        logging = logging.with_json();
    }
    if args.log_locations {
        logging = logging.with_file_info();
    }
    setup_logging(logging)?;

    let config = match &args.config {
        Some(path) => MonitorConfig::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    let prefix = args
        .prefix
        .clone()
        .unwrap_or_else(|| config.parser.technology_prefix.clone());

    let queue_text = read_capture(&args.queues).await?;
    let channel_text = match &args.channels {
        Some(path) => read_capture(path).await?,
        None => String::new(),
    };
    let peers = match &args.peers {
        Some(path) => parser::parse_peers(&read_capture(path).await?),
        None => PeerTable::default(),
    };

    let blocks = parser::parse_queue_listing(&queue_text, None, &prefix);
    let channels = parser::parse_channels(&channel_text, &prefix);
    info!(
        "📂 Replaying {} queues, {} channels, {} peers ({} registered)",
        blocks.len(),
        channels.len(),
        peers.len(),
        peers.iter().filter(|peer| peer.registered).count()
    );

    let records: Vec<_> = parser::memberships(&blocks).cloned().collect();
    let mut agents = correlate::aggregate_agents(&peers, &records, &channels, &prefix);
    if let Some(extension) = &args.extension {
        agents = vec![correlate::aggregate_agent(
            extension,
            peers.get(extension),
            &records,
            &channels,
            &prefix,
        )];
    }

    let queues: Vec<QueueSummary> = blocks.iter().map(|block| block.summary()).collect();
    let replay = Replay {
        totals: StateTotals::tally(&agents),
        calls_waiting: queues.iter().map(|queue| queue.calls_waiting).sum(),
        call_pairs: correlate::correlate_bridges(&channels),
        agents,
        queues,
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&replay)?
    } else {
        serde_json::to_string(&replay)?
    };
    println!("{}", json);
    Ok(())
}

async fn read_capture(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}
