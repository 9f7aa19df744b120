use anyhow::Result;
use chrono::{TimeZone, Utc};
use dotenvy::dotenv;
use log::{error, info};
use std::env;
use std::time::Duration;

use keeper::core::Config;
use keeper::database::Database;
use keeper::features::cycles::{refresh_pass, reminder_pass, PassSummary};
use keeper::features::delivery::OutboxTransport;
use keeper::features::reminders::{ContactState, ReminderScheduler, ReminderStateMachine, StoredState};
use keeper::features::contacts::ContactRecord;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::load()?;
    let database = Database::open(&config.database_path)?;
    let scheduler = ReminderScheduler::new(config.reminder_interval, config.reminder_backoff);
    let machine = ReminderStateMachine::new(scheduler, config.reset_count_on_contact);
    let transport = OutboxTransport::new(database.clone());

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("run");

    match command {
        "run" => run_loop(&config, &database, &machine, &transport).await,
        "refresh" => {
            let summary = refresh_pass(&database, &database, &machine, &config.group).await?;
            log_summary("Refresh", &summary);
            Ok(())
        }
        "remind" => {
            let summary = reminder_pass(
                &database,
                &database,
                &machine,
                &transport,
                &config.group,
                &config.message_template,
                &config.notify_address,
            )
            .await?;
            log_summary("Reminder", &summary);
            Ok(())
        }
        "next" => show_next_reminders(&config, &database, &machine).await,
        "reset" => reset_states(&config, &database).await,
        "add" => add_contact(&config, &database, &args[1..]).await,
        "log" => log_message(&database, &args[1..]).await,
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!("Usage: keeper [run|refresh|remind|next|reset|add|log]");
            std::process::exit(2);
        }
    }
}

/// Drive both passes from a single task so they never overlap.
async fn run_loop(
    config: &Config,
    database: &Database,
    machine: &ReminderStateMachine,
    transport: &OutboxTransport,
) -> Result<()> {
    let mut refresh = tokio::time::interval(Duration::from_secs(config.refresh_cadence_hours * 3600));
    let mut remind =
        tokio::time::interval(Duration::from_secs(config.reminder_cadence_minutes * 60));

    info!(
        "Tracking group '{}': refresh every {}h, reminders every {}m",
        config.group, config.refresh_cadence_hours, config.reminder_cadence_minutes
    );

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                match refresh_pass(database, database, machine, &config.group).await {
                    Ok(summary) => log_summary("Refresh", &summary),
                    Err(err) => error!("Refresh pass aborted: {err:#}"),
                }
            }
            _ = remind.tick() => {
                match reminder_pass(
                    database,
                    database,
                    machine,
                    transport,
                    &config.group,
                    &config.message_template,
                    &config.notify_address,
                )
                .await
                {
                    Ok(summary) => log_summary("Reminder", &summary),
                    Err(err) => error!("Reminder pass aborted: {err:#}"),
                }
            }
        }
    }
}

fn log_summary(pass: &str, summary: &PassSummary) {
    info!(
        "{pass} pass complete: {} processed, {} updated, {} due, {} failed",
        summary.processed, summary.updated, summary.due, summary.failed
    );
}

/// Print each tracked contact's next reminder time without touching stored
/// state.
async fn show_next_reminders(
    config: &Config,
    database: &Database,
    machine: &ReminderStateMachine,
) -> Result<()> {
    let now = Utc::now().timestamp_millis();
    for contact in database.contacts_in_group(&config.group).await? {
        let raw = contact.load_state(&config.group).await?;
        let stored = raw.as_deref().and_then(StoredState::parse);
        let state = ContactState::from_stored(stored, machine.scheduler(), now);
        println!(
            "{}: {} (reminded {} times)",
            contact.display_name(),
            format_time(state.next_reminder),
            state.times_reminded
        );
    }
    Ok(())
}

/// Clear stored reminder state so defaults regenerate on the next pass.
async fn reset_states(config: &Config, database: &Database) -> Result<()> {
    for contact in database.contacts_in_group(&config.group).await? {
        info!("Resetting state for {}", contact.display_name());
        database
            .clear_contact_field(contact.id(), &config.group)
            .await?;
    }
    Ok(())
}

async fn add_contact(config: &Config, database: &Database, args: &[String]) -> Result<()> {
    let Some(name) = args.first() else {
        anyhow::bail!("Usage: keeper add <name> [address...]");
    };
    let addresses: Vec<String> = args[1..].to_vec();
    let id = database.add_contact(name, &addresses, &config.group).await?;
    println!("Added {name} (#{id}) to '{}'", config.group);
    Ok(())
}

async fn log_message(database: &Database, args: &[String]) -> Result<()> {
    let (Some(address), Some(subject)) = (args.first(), args.get(1)) else {
        anyhow::bail!("Usage: keeper log <address> <subject> [link]");
    };
    let link = args.get(2).map(String::as_str);
    database
        .record_message(address, Some(subject), link, Utc::now().timestamp_millis())
        .await?;
    println!("Logged message with {address}");
    Ok(())
}

fn format_time(timestamp: i64) -> String {
    Utc.timestamp_millis_opt(timestamp)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
