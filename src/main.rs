//! Audience Agent CLI
//!
//! Records behavior tags, flushes them to the collection endpoint and looks
//! up the device's audience profile.

use anyhow::{bail, Context};
use audience_agent::{
    config::AgentSettings,
    core::{EventTracker, RequestBuilder, KEY_BEHAVIOR, KEY_OPPORTUNITY, RAND_MAX},
    transparency::DispatchStats,
    Agent, BehaviorEvent, HostIdentity, IdentityProvider, TRACKING_NOTICE, VERSION,
};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "audience-agent")]
#[command(version = VERSION)]
#[command(about = "Behavior tracking and audience profile agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Events given on the command line.
#[derive(clap::Args)]
struct EventArgs {
    /// Client id (overrides the stored one)
    #[arg(long)]
    client_id: Option<String>,

    /// Behavior ids to record
    #[arg(long = "behavior")]
    behaviors: Vec<i64>,

    /// Opportunity ids to record
    #[arg(long = "opportunity")]
    opportunities: Vec<i64>,

    /// Free-form tags as key=value (or a bare key for a marker)
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record events and send them in one batch
    Send(EventArgs),

    /// Fetch and print the audience profile
    Audience {
        /// Client id (overrides the stored one)
        #[arg(long)]
        client_id: Option<String>,
    },

    /// Print the URLs that would be requested, without sending anything
    Urls(EventArgs),

    /// Read key=value lines from stdin and flush periodically
    Watch {
        /// Client id (overrides the stored one)
        #[arg(long)]
        client_id: Option<String>,

        /// Flush interval in seconds (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Store the client id used by default
    Init {
        client_id: String,
    },

    /// Allow tracking
    Enable,

    /// Disallow tracking; pending events are discarded
    Disable,

    /// Show dispatch statistics
    Stats,

    /// Display the tracking notice
    Privacy,

    /// Show configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("audience_agent=info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = AgentSettings::load().context("loading settings")?;

    match cli.command {
        Commands::Send(events) => cmd_send(settings, events).await,
        Commands::Audience { client_id } => cmd_audience(settings, client_id).await,
        Commands::Urls(events) => cmd_urls(&settings, events),
        Commands::Watch {
            client_id,
            interval,
        } => cmd_watch(settings, client_id, interval).await,
        Commands::Init { client_id } => cmd_init(settings, client_id),
        Commands::Enable => cmd_set_tracking(settings, true),
        Commands::Disable => cmd_set_tracking(settings, false),
        Commands::Stats => cmd_stats(&settings),
        Commands::Privacy => {
            println!("{TRACKING_NOTICE}");
            Ok(())
        }
        Commands::Config => cmd_config(&settings),
    }
}

fn build_agent(mut settings: AgentSettings, client_id: Option<String>) -> anyhow::Result<Agent> {
    if client_id.is_some() {
        settings.client_id = client_id;
    }
    Agent::from_settings(&settings, Handle::current()).context("creating agent")
}

/// Split `key=value`; a bare key becomes a value-less marker.
fn parse_tag(tag: &str) -> BehaviorEvent {
    match tag.split_once('=') {
        Some((key, value)) => BehaviorEvent::new(key.trim(), value.trim()),
        None => BehaviorEvent::marker(tag.trim()),
    }
}

fn record_events(agent: &Agent, events: &EventArgs) {
    for id in &events.behaviors {
        agent.add_behavior_id(*id);
    }
    for id in &events.opportunities {
        agent.add_opportunity_id(*id);
    }
    for tag in &events.tags {
        let event = parse_tag(tag);
        agent.add_behavior_data(event.value.unwrap_or_default(), event.key);
    }
}

async fn cmd_send(settings: AgentSettings, events: EventArgs) -> anyhow::Result<()> {
    let agent = build_agent(settings, events.client_id.clone())?;
    record_events(&agent, &events);

    let result = agent.send_behavior_data().await;
    if let Err(e) = agent.stats().save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    let receipt = result?;
    println!("Sent {} parameters", receipt.events_sent);
    println!("  {}", receipt.url);
    Ok(())
}

async fn cmd_audience(settings: AgentSettings, client_id: Option<String>) -> anyhow::Result<()> {
    let agent = build_agent(settings, client_id)?;

    let result = agent.get_audience_data().await;
    if let Err(e) = agent.stats().save() {
        eprintln!("Warning: Could not save stats: {e}");
    }

    let profile = result?;
    println!("{}", profile.to_json_string());
    Ok(())
}

fn cmd_urls(settings: &AgentSettings, events: EventArgs) -> anyhow::Result<()> {
    let client = settings.client_config(events.client_id.as_deref())?;
    if !client.is_initialized() {
        bail!("no client id; pass --client-id or run `audience-agent init <id>`");
    }

    let identity = HostIdentity::new(settings.tracking_enabled);
    let Some(advertising_id) = identity.advertising_identifier() else {
        bail!("tracking is disabled");
    };

    let mut tracker = EventTracker::new();
    for id in &events.behaviors {
        tracker.append(BehaviorEvent::new(KEY_BEHAVIOR, id.to_string()));
    }
    for id in &events.opportunities {
        tracker.append(BehaviorEvent::new(KEY_OPPORTUNITY, id.to_string()));
    }
    for tag in &events.tags {
        tracker.append(parse_tag(tag));
    }

    let batch = tracker.drain_for_send(rand::thread_rng().gen_range(0..=RAND_MAX));
    let request = RequestBuilder::new(client, advertising_id);

    println!("Send:    {}", request.send_url(&batch.events));
    println!("Profile: {}", request.profile_url());
    Ok(())
}

async fn cmd_watch(
    settings: AgentSettings,
    client_id: Option<String>,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let flush_interval = interval
        .map(Duration::from_secs)
        .unwrap_or(settings.flush_interval);
    let agent = build_agent(settings, client_id)?;

    let status = agent.status()?;
    if !status.is_initialized {
        bail!("no client id; pass --client-id or run `audience-agent init <id>`");
    }

    println!("Audience Agent v{VERSION}");
    println!("  Client ID: {}", status.client.client_id);
    println!("  Flush interval: {}s", flush_interval.as_secs());
    println!();
    println!("Reading key=value lines from stdin. Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("installing Ctrl+C handler")?;

    let reader_agent = agent.clone();
    let reader_running = running.clone();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let event = parse_tag(line);
            reader_agent.add_behavior_data(event.value.unwrap_or_default(), event.key);
        }
        reader_running.store(false, Ordering::SeqCst);
    });

    let flusher = agent.start_periodic_flush(flush_interval);
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    flusher.stop();

    println!();
    println!("Stopping...");
    if agent.status()?.pending_events > 0 {
        match agent.send_behavior_data().await {
            Ok(receipt) => println!("Final flush sent {} parameters", receipt.events_sent),
            Err(e) => eprintln!("Final flush failed: {e}"),
        }
    }

    if let Err(e) = agent.stats().save() {
        eprintln!("Warning: Could not save stats: {e}");
    }
    println!();
    println!("{}", agent.stats().summary());
    Ok(())
}

fn cmd_init(mut settings: AgentSettings, client_id: String) -> anyhow::Result<()> {
    settings.client_id = Some(client_id.clone());
    settings.client_config(None)?;
    settings.save()?;
    println!("Client ID set to {client_id}");
    Ok(())
}

fn cmd_set_tracking(mut settings: AgentSettings, enabled: bool) -> anyhow::Result<()> {
    settings.tracking_enabled = enabled;
    settings.save()?;
    if enabled {
        println!("Tracking enabled.");
    } else {
        println!("Tracking disabled. No events will be recorded or sent.");
    }
    Ok(())
}

fn cmd_stats(settings: &AgentSettings) -> anyhow::Result<()> {
    let stats = DispatchStats::with_persistence(settings.data_path.join("stats.json"));
    println!("{}", stats.summary());
    Ok(())
}

fn cmd_config(settings: &AgentSettings) -> anyhow::Result<()> {
    println!("Configuration file: {:?}", AgentSettings::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
