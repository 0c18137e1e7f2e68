use crate::model::{Checklist, Task};
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use directories::ProjectDirs;
use serde::Deserialize;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "data";
const TEMPLATE_FILE_NAME: &str = "template";
const CONFIG_FILE_NAME: &str = "daylist.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreScope {
    Local,
    Global,
}

/// Where the day files live: a `data/` directory found in or above the
/// working directory, or the per-user platform data directory.
#[derive(Debug, Clone)]
pub struct Store {
    pub root: PathBuf,
    pub scope: StoreScope,
}

/// Optional `daylist.yml` next to a local store or in the platform config
/// directory. A relative `data_dir` resolves against the config file's
/// directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub data_dir: Option<PathBuf>,
}

impl Store {
    /// Path of the day file for `date`: `<root>/YYYY-MM-DD`, zero-padded,
    /// 1-based month.
    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.root.join(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        ))
    }

    pub fn template_path(&self) -> PathBuf {
        self.root.join(TEMPLATE_FILE_NAME)
    }

    pub fn scope_label(&self) -> &'static str {
        match self.scope {
            StoreScope::Local => "local",
            StoreScope::Global => "global",
        }
    }
}

pub fn init_local_store() -> Result<Store> {
    let cwd = env::current_dir()?;
    let root = cwd.join(DATA_DIR_NAME);
    fs::create_dir_all(&root).with_context(|| format!("creating {:?}", root))?;
    Ok(Store {
        root,
        scope: StoreScope::Local,
    })
}

/// Resolve the store for `start`: a config file found walking up from
/// `start` wins, then an existing local `data/` directory, then a config in
/// the platform config directory, then the platform data directory.
pub fn locate_store(start: &Path) -> Result<Store> {
    if let Some((dir, config)) = find_local_config(start)? {
        return Ok(Store {
            root: config_root(&dir, &config),
            scope: StoreScope::Local,
        });
    }
    let local = start.join(DATA_DIR_NAME);
    if local.is_dir() {
        return Ok(Store {
            root: local,
            scope: StoreScope::Local,
        });
    }
    let dirs = project_dirs()?;
    let global_config = dirs.config_dir().join(CONFIG_FILE_NAME);
    if global_config.exists() {
        let config = read_config(&global_config)?;
        return Ok(Store {
            root: config_root(dirs.config_dir(), &config),
            scope: StoreScope::Global,
        });
    }
    Ok(Store {
        root: dirs.data_dir().to_path_buf(),
        scope: StoreScope::Global,
    })
}

/// Load one day's checklist. A missing file is an empty day, not an error;
/// anything else (unreadable file, malformed line) propagates.
pub fn load_day(path: &Path) -> Result<Checklist> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Checklist::new()),
        Err(err) => return Err(err).with_context(|| format!("reading {:?}", path)),
    };
    let mut tasks = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        let task =
            Task::parse_line(line, idx + 1).with_context(|| format!("parsing {:?}", path))?;
        tasks.push(task);
    }
    Ok(Checklist::from_tasks(tasks))
}

/// Write one day's checklist, one `"<0|1> <text>"` record per line. Failure
/// here is fatal by design: the caller propagates it out of the event loop
/// rather than risk a checklist that silently never reached disk.
pub fn save_day(path: &Path, list: &Checklist) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let mut out = String::new();
    for task in list.tasks() {
        out.push_str(&task.to_line());
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("writing {:?}", path))?;
    log::debug!("wrote {} tasks to {:?}", list.len(), path);
    Ok(())
}

fn find_local_config(start: &Path) -> Result<Option<(PathBuf, Config)>> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        let candidate = current.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            let config = read_config(&candidate)?;
            return Ok(Some((current.to_path_buf(), config)));
        }
        dir = current.parent();
    }
    Ok(None)
}

fn read_config(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    serde_yaml::from_str(&data).with_context(|| format!("parsing {:?}", path))
}

fn config_root(config_dir: &Path, config: &Config) -> PathBuf {
    match &config.data_dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => config_dir.join(dir),
        None => config_dir.join(DATA_DIR_NAME),
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "daylist").context("locating data directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> Store {
        Store {
            root: dir.path().join(DATA_DIR_NAME),
            scope: StoreScope::Local,
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn day_path_is_zero_padded() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let path = store.day_path(date(2024, 3, 7));
        assert!(path.ends_with("data/2024-03-07"));
        assert!(store.template_path().ends_with("data/template"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut list = Checklist::new();
        list.add("buy milk");
        list.add("call mom");
        list.select_next();
        list.toggle_active();

        let path = store.day_path(date(2024, 3, 7));
        save_day(&path, &list).unwrap();

        let loaded = load_day(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.tasks()[0].text, "buy milk");
        assert!(!loaded.tasks()[0].done);
        assert_eq!(loaded.tasks()[1].text, "call mom");
        assert!(loaded.tasks()[1].done);

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "0 buy milk\n1 call mom\n");
    }

    #[test]
    fn missing_day_file_is_an_empty_day() {
        let dir = TempDir::new().unwrap();
        let list = load_day(&store(&dir).day_path(date(2024, 3, 8))).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn malformed_line_reports_path_and_line() {
        let dir = TempDir::new().unwrap();
        let path = store(&dir).day_path(date(2024, 3, 9));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "0 fine\nbroken\n").unwrap();

        let err = load_day(&path).unwrap_err();
        let report = format!("{:#}", err);
        assert!(report.contains("2024-03-09"));
        assert!(report.contains("line 2"));
    }

    #[test]
    fn locate_prefers_an_existing_local_store() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(DATA_DIR_NAME)).unwrap();
        let store = locate_store(dir.path()).unwrap();
        assert_eq!(store.scope, StoreScope::Local);
        assert_eq!(store.root, dir.path().join(DATA_DIR_NAME));
    }

    #[test]
    fn config_file_overrides_the_store_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "data_dir: days\n").unwrap();
        let store = locate_store(dir.path()).unwrap();
        assert_eq!(store.scope, StoreScope::Local);
        assert_eq!(store.root, dir.path().join("days"));
    }

    #[test]
    fn config_is_found_from_a_subdirectory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "data_dir: days\n").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        let store = locate_store(&nested).unwrap();
        assert_eq!(store.root, dir.path().join("days"));
    }
}
