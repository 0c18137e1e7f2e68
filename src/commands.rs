use crate::storage::{self, Store};
use crate::ui;
use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::env;
use std::fs::File;

pub fn init() -> Result<()> {
    let store = storage::init_local_store()?;
    println!("Initialized store at {}", store.root.display());
    Ok(())
}

pub fn list(day: Option<String>) -> Result<()> {
    let store = resolve_store()?;
    let date = parse_day(day.as_deref())?;
    let list = storage::load_day(&store.day_path(date))?;
    println!("{} ({})", date.format("%Y-%m-%d"), store.scope_label());
    if list.is_empty() {
        println!("  (empty)");
    }
    for task in list.tasks() {
        println!("  [{}] {}", if task.done { 'x' } else { ' ' }, task.text);
    }
    Ok(())
}

pub fn add(text: String, day: Option<String>) -> Result<()> {
    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("task text must not be empty");
    }
    if text.contains('\n') {
        bail!("task text must not contain a newline");
    }
    let store = resolve_store()?;
    let date = parse_day(day.as_deref())?;
    let path = store.day_path(date);
    let mut list = storage::load_day(&path)?;
    list.add(text.clone());
    storage::save_day(&path, &list)?;
    println!("Added \"{}\" to {}", text, date.format("%Y-%m-%d"));
    Ok(())
}

pub fn tui() -> Result<()> {
    let store = resolve_store()?;
    init_logger();
    log::info!(
        "daylist starting with {} store at {:?}",
        store.scope_label(),
        store.root
    );
    ui::run(store)
}

fn resolve_store() -> Result<Store> {
    let cwd = env::current_dir()?;
    storage::locate_store(&cwd)
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate> {
    let raw = match input {
        Some(raw) => raw.trim(),
        None => return Ok(Local::now().date_naive()),
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid day format (use YYYY-MM-DD): {}", raw))
}

// The TUI owns the terminal, so runtime diagnostics go to a file instead of
// stderr. Logging is best-effort; a read-only directory just means no log.
fn init_logger() {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(file) = File::create("daylist.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, config, file);
    }
}
