//! Release status shown next to a movie: upcoming, in theaters or available.
//!
//! The thresholds are a fixed product rule, not configuration: a release more
//! than 30 days ahead is upcoming, anything from 90 days ago up to 30 days ahead
//! (both ends included) is in theaters, anything older is available.

use std::fmt;

use serde::Serialize;
use time::{macros::format_description, Date};

pub const UPCOMING_AFTER_DAYS: i64 = 30;
pub const IN_THEATERS_FOR_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Upcoming,
    InTheaters,
    Available,
}

impl ReleaseStatus {
    /// Display label in the catalogue's locale (es-MX).
    pub fn label(self) -> &'static str {
        match self {
            ReleaseStatus::Upcoming => "Próximamente",
            ReleaseStatus::InTheaters => "En cines",
            ReleaseStatus::Available => "Disponible",
        }
    }
}

impl fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReleaseStatus::Upcoming => "upcoming",
            ReleaseStatus::InTheaters => "in theaters",
            ReleaseStatus::Available => "available",
        })
    }
}

pub fn parse_release_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Classifies by whole calendar days between `today` and the release date.
/// A missing or unparseable date counts as upcoming.
pub fn classify_release(release_date: Option<&str>, today: Date) -> ReleaseStatus {
    let Some(release) = release_date.and_then(parse_release_date) else {
        return ReleaseStatus::Upcoming;
    };
    let days = (release - today).whole_days();
    if days > UPCOMING_AFTER_DAYS {
        ReleaseStatus::Upcoming
    } else if days >= -IN_THEATERS_FOR_DAYS {
        ReleaseStatus::InTheaters
    } else {
        ReleaseStatus::Available
    }
}
