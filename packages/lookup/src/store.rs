//! Running carbohydrate total, persisted as a JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::types::FoodItem;

/// Errors from reading or writing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

/// Receives every item a successful lookup accepted.
pub trait FoodReporter: Send + Sync {
    fn report(&self, item: &FoodItem, citations: &[String]) -> Result<(), StoreError>;
}

/// One logged food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedItem {
    pub name: String,
    pub carbs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<String>,
    pub logged_at: DateTime<Utc>,
}

/// Persistent state of the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarbLog {
    #[serde(default)]
    pub total_carbs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_goal: Option<f64>,
    #[serde(default)]
    pub items: Vec<LoggedItem>,
}

impl CarbLog {
    pub fn last_item(&self) -> Option<&LoggedItem> {
        self.items.last()
    }

    /// Grams left before the daily goal, negative when over it.
    pub fn remaining(&self) -> Option<f64> {
        self.daily_goal.map(|goal| goal - self.total_carbs)
    }
}

/// File-backed store. A missing file reads as an empty log.
pub struct JsonFileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store path from `CARPECARB_STORE`, defaulting to `carpecarb.json`.
    pub fn from_env() -> Self {
        let path = std::env::var("CARPECARB_STORE").unwrap_or_else(|_| "carpecarb.json".into());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<CarbLog, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(CarbLog::default()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CarbLog::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Add an item to the log and the running total.
    pub fn add_food(
        &self,
        name: &str,
        carbs: f64,
        details: Option<&str>,
        citations: &[String],
    ) -> Result<CarbLog, StoreError> {
        self.update(|log| {
            log.total_carbs += carbs;
            log.items.push(LoggedItem {
                name: name.to_string(),
                carbs,
                details: details.map(str::to_string),
                citations: citations.to_vec(),
                logged_at: Utc::now(),
            });
        })
    }

    /// Set the daily goal; `None` or a non-positive value clears it.
    pub fn set_daily_goal(&self, goal: Option<f64>) -> Result<CarbLog, StoreError> {
        self.update(|log| {
            log.daily_goal = goal.filter(|g| g.is_finite() && *g > 0.0);
        })
    }

    /// Clear the total and the item log. The daily goal is kept.
    pub fn reset(&self) -> Result<CarbLog, StoreError> {
        self.update(|log| {
            log.total_carbs = 0.0;
            log.items.clear();
        })
    }

    fn update(&self, apply: impl FnOnce(&mut CarbLog)) -> Result<CarbLog, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut log = self.load()?;
        apply(&mut log);
        self.save(&log)?;
        Ok(log)
    }

    fn save(&self, log: &CarbLog) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // Write-then-rename so readers never see a half-written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(log)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), total = log.total_carbs, "store saved");
        Ok(())
    }
}

impl FoodReporter for JsonFileStore {
    fn report(&self, item: &FoodItem, citations: &[String]) -> Result<(), StoreError> {
        self.add_food(&item.name, item.carbs, item.details.as_deref(), citations)?;
        Ok(())
    }
}
