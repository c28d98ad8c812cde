//! Address and opening schedules.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Street address with map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl Address {
    pub fn new(street: impl Into<String>, longitude: f64, latitude: f64) -> Self {
        Self {
            street: street.into(),
            longitude,
            latitude,
        }
    }
}

/// Opening hours applying to a set of weekdays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default)]
    pub weekdays: Vec<Weekday>,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
}

impl Schedule {
    pub fn new(weekdays: Vec<Weekday>, opens_at: NaiveTime, closes_at: NaiveTime) -> Self {
        Self {
            weekdays,
            opens_at,
            closes_at,
        }
    }

    /// A schedule row the editor left untouched. Blank rows are dropped on
    /// submission and do not count towards the one-schedule minimum.
    pub fn is_blank(&self) -> bool {
        self.weekdays.is_empty()
    }
}
