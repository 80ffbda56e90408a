mod alarm;
mod notify;
mod storage;
mod theme;

use std::path::PathBuf;

use anyhow::{Result, bail};
use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};

use crate::alarm::model::{AlarmDraft, Ringtone, WeekdayToken};
use crate::alarm::scheduler::{AlarmReconciler, ReconcileOutcome};
use crate::alarm::store::AlarmStore;
use crate::notify::{FileBackend, NotificationPayload};
use crate::storage::KeyValueStore;
use crate::theme::{THEMES, active_theme, set_theme};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRingtone {
    Default,
    Gentle,
    Energetic,
    Classic,
}

impl From<CliRingtone> for Ringtone {
    fn from(value: CliRingtone) -> Self {
        match value {
            CliRingtone::Default => Ringtone::Default,
            CliRingtone::Gentle => Ringtone::Gentle,
            CliRingtone::Energetic => Ringtone::Energetic,
            CliRingtone::Classic => Ringtone::Classic,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "chime",
    version,
    about = "Local alarm clock with snoozeable scheduled notifications"
)]
struct Cli {
    /// Directory holding the alarm list, theme selection, and pending
    /// notification set
    #[arg(long, default_value = "chime-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an alarm and schedule its notifications
    Add {
        #[arg(long, default_value = "New alarm")]
        title: String,

        #[arg(long, default_value = "07:00", value_parser = parse_alarm_time)]
        time: NaiveTime,

        /// Repeat days (comma separated); omit for a one-time alarm
        #[arg(long, value_delimiter = ',', value_parser = parse_weekday)]
        days: Vec<WeekdayToken>,

        #[arg(long, value_enum, default_value_t = CliRingtone::Default)]
        ringtone: CliRingtone,

        #[arg(long, default_value_t = 80)]
        volume: u8,

        #[arg(long)]
        no_vibration: bool,

        /// Snooze duration in minutes (5, 10, 15, or 30)
        #[arg(long, default_value_t = 10)]
        snooze: u32,

        #[arg(long)]
        disabled: bool,
    },
    /// Replace an alarm's fields, keeping its identifier
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, value_parser = parse_alarm_time)]
        time: Option<NaiveTime>,

        /// New repeat days; pass `--days` with no value to make the
        /// alarm one-time
        #[arg(long, value_delimiter = ',', value_parser = parse_weekday, num_args = 0..)]
        days: Option<Vec<WeekdayToken>>,

        #[arg(long, value_enum)]
        ringtone: Option<CliRingtone>,

        #[arg(long)]
        volume: Option<u8>,

        #[arg(long)]
        vibration: Option<bool>,

        #[arg(long)]
        snooze: Option<u32>,

        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Delete an alarm and cancel its notifications
    Remove { id: String },
    /// Flip an alarm between enabled and disabled
    Toggle { id: String },
    /// Show the alarm list
    List,
    /// Show the pending notification set
    Pending,
    /// Deliver a notification action (as the platform would) for an
    /// alarm's firing notification
    Action {
        #[arg(value_parser = ["snooze", "dismiss"])]
        action: String,
        id: String,
    },
    /// Show the active theme, or switch to the named one
    Theme { key: Option<String> },
    /// Cancel every pending notification
    Reset,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let storage = KeyValueStore::open(&cli.data_dir)?;
    let backend = FileBackend::new(cli.data_dir.join("pending-notifications.json"));
    let mut reconciler = AlarmReconciler::new(Box::new(backend));
    reconciler.init();
    let mut store = AlarmStore::load(storage.clone());
    let now = Local::now();

    match cli.command {
        Command::Add {
            title,
            time,
            days,
            ringtone,
            volume,
            no_vibration,
            snooze,
            disabled,
        } => {
            let draft = AlarmDraft {
                title,
                time,
                days,
                enabled: !disabled,
                ringtone: ringtone.into(),
                volume,
                vibration: !no_vibration,
                snooze,
            };
            let alarm = store.create(draft, now)?;
            let outcome = reconciler.schedule(&alarm, now);
            println!(
                "added alarm {} (\"{}\" at {}, {})",
                alarm.id,
                alarm.title,
                alarm.time.format("%H:%M"),
                format_days(&alarm.days)
            );
            report_outcome(&outcome);
        }
        Command::Edit {
            id,
            title,
            time,
            days,
            ringtone,
            volume,
            vibration,
            snooze,
            enabled,
        } => {
            let Some(existing) = store.get(&id) else {
                bail!("no alarm with id '{id}'");
            };
            let mut draft = AlarmDraft::from_alarm(existing);
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(time) = time {
                draft.time = time;
            }
            if let Some(days) = days {
                draft.days = days;
            }
            if let Some(ringtone) = ringtone {
                draft.ringtone = ringtone.into();
            }
            if let Some(volume) = volume {
                draft.volume = volume;
            }
            if let Some(vibration) = vibration {
                draft.vibration = vibration;
            }
            if let Some(snooze) = snooze {
                draft.snooze = snooze;
            }
            if let Some(enabled) = enabled {
                draft.enabled = enabled;
            }
            let alarm = store.update(&id, draft)?;
            let outcome = reconciler.schedule(&alarm, now);
            println!("updated alarm {}", alarm.id);
            report_outcome(&outcome);
        }
        Command::Remove { id } => {
            let removed = store.remove(&id)?;
            let outcome = reconciler.cancel(&removed.id);
            println!("removed alarm {}", removed.id);
            report_outcome(&outcome);
        }
        Command::Toggle { id } => {
            let alarm = store.toggle(&id)?;
            let outcome = if alarm.enabled {
                reconciler.schedule(&alarm, now)
            } else {
                reconciler.cancel(&alarm.id)
            };
            println!(
                "alarm {} {}",
                alarm.id,
                if alarm.enabled { "enabled" } else { "disabled" }
            );
            report_outcome(&outcome);
        }
        Command::List => {
            if store.alarms().is_empty() {
                println!("no alarms");
            }
            for alarm in store.alarms() {
                println!(
                    "{}  {}  {}  {}  {}  vol {:>3}  {}  snooze {}m  \"{}\"",
                    alarm.id,
                    if alarm.enabled { "on " } else { "off" },
                    alarm.time.format("%H:%M"),
                    format_days(&alarm.days),
                    alarm.ringtone,
                    alarm.volume,
                    if alarm.vibration { "vibrate" } else { "silent" },
                    alarm.snooze,
                    alarm.title
                );
            }
        }
        Command::Pending => {
            let pending = reconciler.pending();
            if pending.is_empty() {
                println!("no pending notifications");
            }
            for request in pending {
                println!(
                    "{}  {}  {}  \"{}\"",
                    request.id,
                    request.at.format("%Y-%m-%d %H:%M"),
                    if request.repeats { "weekly" } else { "once" },
                    request.title
                );
            }
        }
        Command::Action { action, id } => {
            let Some(alarm) = store.get(&id).cloned() else {
                bail!("no alarm with id '{id}'");
            };
            let payload = NotificationPayload {
                alarm_id: alarm.id.clone(),
                volume: alarm.volume,
                vibration: alarm.vibration,
                snooze: alarm.snooze,
            };
            let outcome = reconciler.handle_action(&action, &payload, store.alarms(), now);
            match action.as_str() {
                "snooze" if !outcome.scheduled.is_empty() => {
                    println!("snoozed alarm {} for {} minutes", alarm.id, alarm.snooze);
                }
                "dismiss" => println!("dismissed alarm {}", alarm.id),
                _ => {}
            }
            report_outcome(&outcome);
        }
        Command::Theme { key } => match key {
            Some(key) => {
                let selected = set_theme(&storage, &key)?;
                println!("theme set to {} ({})", selected.key, selected.name);
            }
            None => {
                let active = active_theme(&storage);
                println!("active theme: {} ({})", active.key, active.name);
                println!("available:");
                for theme in &THEMES {
                    println!(
                        "  {:<13} {} - {} (primary {}, accent {}, background {})",
                        theme.key,
                        theme.name,
                        theme.description,
                        theme.preview.primary,
                        theme.preview.accent,
                        theme.preview.background
                    );
                }
            }
        },
        Command::Reset => {
            let outcome = reconciler.cancel_all();
            println!("cancelled {} pending notification(s)", outcome.cancelled);
        }
    }

    Ok(())
}

fn parse_alarm_time(input: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map_err(|_| format!("invalid time '{input}', expected HH:MM"))
}

fn parse_weekday(input: &str) -> Result<WeekdayToken, String> {
    WeekdayToken::parse(input)
        .ok_or_else(|| format!("invalid weekday '{input}', expected Sun, Mon, ... Sat"))
}

fn format_days(days: &[WeekdayToken]) -> String {
    if days.is_empty() {
        return "one-time".to_string();
    }
    days.iter()
        .map(|day| day.token())
        .collect::<Vec<_>>()
        .join(",")
}

fn report_outcome(outcome: &ReconcileOutcome) {
    if outcome.cancelled > 0 {
        println!("cancelled {} notification(s)", outcome.cancelled);
    }
    if !outcome.scheduled.is_empty() {
        println!("scheduled {} notification(s)", outcome.scheduled.len());
    }
    for failure in &outcome.failures {
        eprintln!("warning: notification {}: {}", failure.id, failure.reason);
    }
}
