use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use ticketsync_core::api::HttpTicketApi;
use ticketsync_core::push::SocketPushClient;
use ticketsync_core::tracing_setup::init_tracing;
use ticketsync_core::{FilterSet, SyncConfig, SyncEngine, SyncNotification};
use tokio::sync::mpsc;

fn load_config(path: Option<PathBuf>) -> Result<SyncConfig> {
    let path = path.or_else(SyncConfig::default_path);
    let mut config = match path {
        Some(path) if path.exists() => SyncConfig::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        _ => SyncConfig::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

const USAGE: &str = "usage: watch-tickets <group_title> [config.json] [--unseen] [--external]";

/// Chat filter from command-line flags.
fn chat_filter(flags: &[String]) -> Result<FilterSet> {
    let mut filter = FilterSet::new();
    for flag in flags {
        filter = match flag.as_str() {
            "--unseen" => filter.unseen_only(),
            "--external" => filter.external_author(),
            other => return Err(anyhow!("unknown flag {}\n{}", other, USAGE)),
        };
    }
    Ok(filter)
}

fn print_notification(notification: &SyncNotification) {
    match notification {
        SyncNotification::NewMessage(message) => println!(
            "[MSG] ticket={} sender={} type={} {}",
            message.ticket_id, message.sender_id, message.mtype, message.message
        ),
        SyncNotification::MessageSeen {
            ticket_id,
            client_id,
        } => println!("[SEEN] ticket={} by={}", ticket_id, client_id),
        SyncNotification::MessageDeleted { message_id } => {
            println!("[DELETE] message={}", message_id)
        }
        SyncNotification::TicketRefreshed(ticket) => println!(
            "[TICKET] id={} group={} workflow={} unseen={}",
            ticket.id, ticket.group_title, ticket.workflow, ticket.unseen_count
        ),
        SyncNotification::UnseenChanged { total } => println!("[UNSEEN] total={}", total),
        SyncNotification::SyncFailed { context, message } => {
            println!("[ERROR] {}: {}", context, message)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let (flags, mut args): (Vec<String>, Vec<String>) =
        std::env::args().skip(1).partition(|arg| arg.starts_with("--"));
    if args.is_empty() {
        return Err(anyhow!(USAGE));
    }
    let group_title = args.remove(0);
    let filter = chat_filter(&flags)?;
    let config = load_config(args.into_iter().next().map(PathBuf::from))?;

    init_tracing().context("failed to initialize tracing")?;

    println!("API: {}", config.api_base_url);
    println!("Push: {}", config.push_url);

    let api = HttpTicketApi::from_config(&config);
    let (channel, events, _push_task) = SocketPushClient::from_config(&config).spawn();
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel();
    let engine = SyncEngine::new(config, api, channel, notify_tx);
    let chat_view = !filter.is_unconstrained();
    if chat_view {
        engine.set_chat_filter(filter);
    }

    let loader = engine.clone();
    tokio::spawn(async move {
        match loader.set_scope(&group_title).await {
            Ok(outcome) => {
                println!("[LOAD] {:?}", outcome);
                for ticket in loader.tickets() {
                    println!(
                        "  #{} {} unseen={} {}",
                        ticket.id,
                        ticket.workflow,
                        ticket.unseen_count,
                        ticket.last_message.as_deref().unwrap_or("")
                    );
                }
                if chat_view {
                    println!("[CHAT] {} matching", loader.chat_tickets().len());
                }
            }
            Err(e) => eprintln!("[LOAD] failed: {}", e),
        }
    });

    let runner = engine.clone();
    tokio::spawn(async move { runner.run(events).await });

    loop {
        tokio::select! {
            notification = notify_rx.recv() => match notification {
                Some(notification) => print_notification(&notification),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Stopping. unseen={}", engine.unseen_total());
                break;
            }
        }
    }
    Ok(())
}
