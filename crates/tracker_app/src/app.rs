use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracker_core::{
    completion::{CompletionOutcome, UncompleteOutcome},
    filter::{DateChangePolicy, TrackerFilter},
    palette,
    schedule::tracker_count,
    service::SystemClock,
    NewTracker, TrackerCategory, TrackerId, TrackerService, Weekday, WeekdaySet,
};
use tracker_store::JsonFileStore;

const DEFAULT_STORE_FILE: &str = "trackers.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) store_path: PathBuf,
    pub(crate) pinned_title: Option<String>,
    pub(crate) date_policy: Option<DateChangePolicy>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("TRACKER_STORE_PATH") {
            if !path.trim().is_empty() {
                config.store_path = PathBuf::from(path);
            }
        }
        if let Ok(title) = std::env::var("TRACKER_PINNED_TITLE") {
            if !title.trim().is_empty() {
                config.pinned_title = Some(title.trim().to_string());
            }
        }
        if let Ok(policy) = std::env::var("TRACKER_DATE_POLICY") {
            config.date_policy = Some(
                policy
                    .parse::<DateChangePolicy>()
                    .map_err(anyhow::Error::msg)
                    .context("TRACKER_DATE_POLICY")?,
            );
        }
        Ok(config)
    }

    /// Command-line flags win over the environment.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(path) = &cli.store {
            self.store_path = path.clone();
        }
        if let Some(title) = &cli.pinned_title {
            self.pinned_title = Some(title.clone());
        }
        if let Some(policy) = cli.date_policy {
            self.date_policy = Some(policy);
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            pinned_title: None,
            date_policy: None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "tracker", version, about = "Weekly habit and event tracker")]
pub struct Cli {
    /// Data file to read and write.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Title of the leading section that collects pinned trackers.
    #[arg(long, global = true)]
    pub pinned_title: Option<String>,

    /// What happens to the filter when the date changes: `reset` or `keep`.
    #[arg(long, global = true)]
    pub date_policy: Option<DateChangePolicy>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List trackers for a date.
    Show {
        #[arg(long)]
        date: Option<NaiveDate>,
        /// all, today, completed or not-completed
        #[arg(long)]
        filter: Option<TrackerFilter>,
        #[arg(long, short)]
        query: Option<String>,
    },
    /// List categories and their trackers.
    Categories,
    AddCategory {
        title: String,
    },
    /// Create a recurring habit.
    AddTracker {
        name: String,
        #[arg(long, short)]
        category: String,
        /// Comma separated weekdays (`mon,wed`) or `every`.
        #[arg(long, value_parser = parse_schedule)]
        days: WeekdaySet,
        #[arg(long, default_value_t = 0)]
        emoji: usize,
        #[arg(long, default_value_t = 0)]
        color: usize,
    },
    /// Create a one-off event scheduled on today's weekday.
    AddEvent {
        name: String,
        #[arg(long, short)]
        category: String,
        #[arg(long, default_value_t = 0)]
        emoji: usize,
        #[arg(long, default_value_t = 0)]
        color: usize,
    },
    /// Change a tracker. Omitted options keep their current value.
    Edit {
        id: TrackerId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, value_parser = parse_schedule)]
        days: Option<WeekdaySet>,
        #[arg(long)]
        emoji: Option<usize>,
        #[arg(long)]
        color: Option<usize>,
    },
    /// Toggle the pin flag.
    Pin {
        id: TrackerId,
    },
    Delete {
        id: TrackerId,
    },
    Complete {
        id: TrackerId,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Uncomplete {
        id: TrackerId,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Stats,
    /// Keep printing the day's list whenever the data file changes.
    Watch {
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

pub fn run(config: AppConfig, cli: Cli) -> Result<()> {
    let mut config = config;
    config.merge_cli(&cli);

    let store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("opening {}", config.store_path.display()))?;
    if matches!(cli.command, Command::Watch { .. }) {
        store.watch()?;
    }
    let mut service = TrackerService::builder()
        .with_store(Box::new(store))
        .with_clock(Box::new(SystemClock))
        .build()?;
    apply_config(&mut service, &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Command::Watch { interval_ms } = cli.command {
        return watch(&mut service, Duration::from_millis(interval_ms), &mut out);
    }
    execute(&mut service, cli.command, &mut out)
}

/// Persists configured preferences that differ from the stored ones.
pub fn apply_config(service: &mut TrackerService, config: &AppConfig) -> Result<()> {
    if let Some(title) = &config.pinned_title {
        if service.settings().pinned_title != *title {
            service.set_pinned_title(title)?;
        }
    }
    if let Some(policy) = config.date_policy {
        if service.settings().date_change_policy != policy {
            service.set_date_change_policy(policy)?;
        }
    }
    Ok(())
}

pub fn execute(service: &mut TrackerService, command: Command, out: &mut dyn Write) -> Result<()> {
    debug!(?command, "executing");
    match command {
        Command::Show {
            date,
            filter,
            query,
        } => {
            if let Some(mode) = filter {
                service.select_filter(mode);
            }
            if let Some(date) = date {
                service.select_date(date);
                // the date change may have reset the filter; due-today must
                // not be reselected or the date snaps back to today
                if let Some(mode) = filter.filter(|mode| *mode != TrackerFilter::DueToday) {
                    service.select_filter(mode);
                }
            }
            let query = query.unwrap_or_default();
            let sections = service.visible(&query);
            let heading = format_day_heading(service.filter_state().selected_date(), service.today());
            writeln!(out, "{heading} ({})", service.filter_state().mode())?;
            if sections.is_empty() {
                let hint = if query.trim().is_empty() {
                    "What shall we track?"
                } else {
                    "Nothing found"
                };
                writeln!(out, "{hint}")?;
            } else {
                render_sections(service, &sections, out)?;
            }
        }
        Command::Categories => {
            for category in service.categories() {
                writeln!(out, "{} ({})", category.title, category.trackers.len())?;
                for tracker in &category.trackers {
                    writeln!(
                        out,
                        "  {} {} [{}] {}",
                        tracker.emoji,
                        tracker.name,
                        tracker.schedule.summary(),
                        tracker.id
                    )?;
                }
            }
        }
        Command::AddCategory { title } => {
            service.create_category(&title)?;
            writeln!(out, "Created category {}", title.trim())?;
        }
        Command::AddTracker {
            name,
            category,
            days,
            emoji,
            color,
        } => {
            let new = NewTracker::from_palette(name, emoji, color, days)?;
            let id = service.create_tracker(new, &category)?;
            info!(tracker_id = %id, "tracker added");
            writeln!(out, "{id}")?;
        }
        Command::AddEvent {
            name,
            category,
            emoji,
            color,
        } => {
            let today = service.today();
            let new = NewTracker::event(
                name,
                palette::emoji_at(emoji).ok_or_else(|| out_of_palette("emoji", emoji))?,
                palette::color_at(color).ok_or_else(|| out_of_palette("color", color))?,
                today,
            );
            let new = NewTracker {
                emoji_index: emoji,
                color_index: color,
                ..new
            };
            let id = service.create_tracker(new, &category)?;
            writeln!(out, "{id}")?;
        }
        Command::Edit {
            id,
            name,
            category,
            days,
            emoji,
            color,
        } => {
            let Some(current) = service.tracker(id).cloned() else {
                bail!("no tracker with id {id}");
            };
            let category = match category {
                Some(category) => category,
                None => service
                    .category_of(id)
                    .map(str::to_string)
                    .context("tracker has no category")?,
            };
            let mut edit = NewTracker::new(
                name.unwrap_or(current.name),
                current.emoji,
                current.color,
                days.unwrap_or(current.schedule),
            );
            edit.emoji_index = current.emoji_index;
            edit.color_index = current.color_index;
            if emoji.is_some() || color.is_some() {
                let resolved = NewTracker::from_palette(
                    edit.name.clone(),
                    emoji.unwrap_or(current.emoji_index),
                    color.unwrap_or(current.color_index),
                    edit.schedule,
                )?;
                edit = resolved;
            }
            service.update_tracker(id, edit, &category)?;
            writeln!(out, "Updated {id}")?;
        }
        Command::Pin { id } => {
            let pinned = service.toggle_pin(id)?;
            writeln!(out, "{}", if pinned { "Pinned" } else { "Unpinned" })?;
        }
        Command::Delete { id } => {
            service.delete_tracker(id)?;
            writeln!(out, "Deleted {id}")?;
        }
        Command::Complete { id, date } => {
            let date = date.unwrap_or_else(|| service.today());
            let message = match service.complete(id, date)? {
                CompletionOutcome::Completed => "Completed",
                CompletionOutcome::AlreadyCompleted => "Already completed",
                CompletionOutcome::FutureDateRejected => "Cannot complete a future date",
            };
            writeln!(out, "{message}")?;
        }
        Command::Uncomplete { id, date } => {
            let date = date.unwrap_or_else(|| service.today());
            let message = match service.uncomplete(id, date)? {
                UncompleteOutcome::Removed => "Completion removed",
                UncompleteOutcome::NotCompleted => "Not completed on that date",
            };
            writeln!(out, "{message}")?;
        }
        Command::Stats => {
            let stats = service.stats();
            writeln!(out, "Trackers completed: {}", stats.trackers_completed)?;
            writeln!(out, "Active days: {}", stats.active_days)?;
        }
        Command::Watch { .. } => bail!("watch needs a file-backed session"),
    }
    Ok(())
}

fn watch(service: &mut TrackerService, interval: Duration, out: &mut dyn Write) -> Result<()> {
    let show = || Command::Show {
        date: None,
        filter: None,
        query: None,
    };
    execute(service, show(), out)?;
    loop {
        std::thread::sleep(interval);
        if let Some(update) = service.poll_external_changes()? {
            info!(
                inserted = update.inserted_items.len(),
                deleted = update.deleted_items.len(),
                "data file changed"
            );
            writeln!(out)?;
            execute(service, show(), out)?;
        }
    }
}

pub fn render_sections(
    service: &TrackerService,
    sections: &[TrackerCategory],
    out: &mut dyn Write,
) -> Result<()> {
    let date = service.filter_state().selected_date();
    for section in sections {
        writeln!(out, "{}", section.title)?;
        for tracker in &section.trackers {
            let state = service.tracker_state(tracker.id, date);
            writeln!(
                out,
                "  [{}] {} {} · {} · {}{}",
                if state.completed_on_date { "x" } else { " " },
                tracker.emoji,
                tracker.name,
                format_days(state.completed_days),
                tracker.schedule.summary(),
                if tracker.pinned { " · pinned" } else { "" },
            )?;
        }
    }
    writeln!(out, "{} trackers", tracker_count(sections))?;
    Ok(())
}

pub fn parse_schedule(raw: &str) -> Result<WeekdaySet, String> {
    let raw = raw.trim();
    if ["every", "daily", "all"]
        .iter()
        .any(|word| raw.eq_ignore_ascii_case(word))
    {
        return Ok(WeekdaySet::EVERY_DAY);
    }
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            Weekday::ALL
                .into_iter()
                .find(|day| {
                    day.short_name().eq_ignore_ascii_case(token)
                        || day.name().eq_ignore_ascii_case(token)
                })
                .ok_or_else(|| format!("unknown weekday `{token}`"))
        })
        .collect()
}

fn out_of_palette(kind: &str, index: usize) -> anyhow::Error {
    anyhow::anyhow!("{kind} index {index} is outside the palette")
}

fn format_days(count: usize) -> String {
    match count {
        1 => "1 day".to_string(),
        n => format!("{n} days"),
    }
}

fn format_day_heading(date: NaiveDate, today: NaiveDate) -> String {
    let calendar = date.format("%A, %d %B %Y");
    match date.signed_duration_since(today).num_days() {
        0 => format!("Today, {calendar}"),
        -1 => format!("Yesterday, {calendar}"),
        1 => format!("Tomorrow, {calendar}"),
        _ => calendar.to_string(),
    }
}
