use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One parsed sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub raw_value: i64,
    pub percentage: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Low,
    Moderate,
    Sufficient,
}

impl Status {
    pub const LOW_MAX: i64 = 30;
    pub const MODERATE_MAX: i64 = 60;

    /// Inclusive upper bounds, no hysteresis.
    pub fn classify(percentage: i64) -> Self {
        if percentage <= Self::LOW_MAX {
            Status::Low
        } else if percentage <= Self::MODERATE_MAX {
            Status::Moderate
        } else {
            Status::Sufficient
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Low => "low",
            Status::Moderate => "moderate",
            Status::Sufficient => "sufficient",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Sad,
    Normal,
    Happy,
}

impl From<Status> for Face {
    fn from(status: Status) -> Self {
        match status {
            Status::Low => Face::Sad,
            Status::Moderate => Face::Normal,
            Status::Sufficient => Face::Happy,
        }
    }
}

/// Latest reading as shown by the status page and `/api/data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub percentage: i64,
    pub raw_value: i64,
    pub status: Option<Status>,
    pub last_update: Option<DateTime<Local>>,
    pub message: String,
    pub character_message: String,
    pub character_face: Face,
}

impl StatusSnapshot {
    pub fn starting(character_message: String) -> Self {
        Self {
            percentage: 0,
            raw_value: 0,
            status: None,
            last_update: None,
            message: "Starting up...".into(),
            character_message,
            character_face: Face::Normal,
        }
    }
}

/// Written only by the reporter, read by the status server.
pub type SharedSnapshot = Arc<RwLock<StatusSnapshot>>;

pub fn shared_snapshot(initial: StatusSnapshot) -> SharedSnapshot {
    Arc::new(RwLock::new(initial))
}
