use std::path::PathBuf;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "Dental Plus";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn default_log_filter() -> String {
    format!("info,{}=debug", env!("CARGO_PKG_NAME").replace('-', "_"))
}

/// Get the application data directory
/// ~/DentalPlus/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("DentalPlus")
}

/// Default path of the clinic database file
pub fn database_path() -> PathBuf {
    app_data_dir().join("clinic.db")
}

/// Daily window within which appointment intervals must fall.
///
/// The clinic runs a fixed day; appointments touching the closing instant are
/// allowed (`[19:30, 20:00)` is bookable) because intervals are half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingWindow {
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl BookingWindow {
    pub fn new(opens: NaiveTime, closes: NaiveTime) -> Self {
        Self { opens, closes }
    }

    /// True when `[start, end)` lies entirely within the window.
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start >= self.opens && end <= self.closes
    }
}

impl Default for BookingWindow {
    fn default() -> Self {
        Self {
            opens: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            closes: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("DentalPlus"));
    }

    #[test]
    fn default_window_is_eight_to_twenty() {
        let w = BookingWindow::default();
        assert_eq!(w.opens, t(8, 0));
        assert_eq!(w.closes, t(20, 0));
    }

    #[test]
    fn window_contains_is_inclusive_of_edges() {
        let w = BookingWindow::default();
        assert!(w.contains(t(8, 0), t(8, 30)));
        assert!(w.contains(t(19, 30), t(20, 0)));
        assert!(!w.contains(t(7, 45), t(8, 15)));
        assert!(!w.contains(t(19, 45), t(20, 15)));
    }
}
