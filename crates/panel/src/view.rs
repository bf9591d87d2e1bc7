use chrono::{DateTime, Utc};
use sitewatch_common::{MonitoredTarget, SiteDetails, SiteStatus};
use std::fmt::Write;

use crate::cell::IntervalCell;

/// Panel-side state of one monitored site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRow {
    pub cell: IntervalCell,
    /// Last server-confirmed enabled flag.
    pub enabled: bool,
    pub status: SiteStatus,
    pub last_checked: Option<DateTime<Utc>>,
    /// A mutation for this site is awaiting the server's answer.
    pub pending: bool,
}

impl TargetRow {
    pub fn from_details(details: SiteDetails) -> Self {
        Self {
            cell: IntervalCell::new(details.url, details.interval),
            enabled: details.enabled,
            status: details.status,
            last_checked: details.last_checked,
            pending: false,
        }
    }

    pub fn url(&self) -> &str {
        self.cell.url()
    }

    pub fn confirmed(&self) -> MonitoredTarget {
        MonitoredTarget {
            url: self.cell.url().to_string(),
            interval: self.cell.confirmed(),
            enabled: self.enabled,
        }
    }

    /// Status column text. Paused sites show no stale check result.
    pub fn status_text(&self) -> &'static str {
        if !self.enabled {
            return "PAUSED";
        }
        match self.status {
            SiteStatus::Up => "UP",
            SiteStatus::Down => "DOWN",
            SiteStatus::Unknown => "UNKNOWN",
        }
    }

    /// Style class for the whole row.
    pub fn row_class(&self) -> &'static str {
        if !self.enabled {
            return "disabled";
        }
        match self.status {
            SiteStatus::Up => "up",
            SiteStatus::Down => "down",
            SiteStatus::Unknown => "unknown",
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.enabled {
            "on"
        } else {
            "off"
        }
    }

    // Takes the server's latest version of this row.
    pub(crate) fn apply(&mut self, details: SiteDetails) {
        self.cell.sync_confirmed(details.interval, self.pending);
        self.enabled = details.enabled;
        self.status = details.status;
        self.last_checked = details.last_checked;
    }
}

/// Renders rows as a fixed-width text table.
pub fn render_table(rows: &[TargetRow]) -> String {
    let url_width = rows
        .iter()
        .map(|r| r.url().len())
        .max()
        .unwrap_or(0)
        .max("URL".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<url_width$}  {:>9}  {:<8}  {:<3}  {}",
        "URL", "INTERVAL", "STATUS", "ON", "LAST CHECKED"
    );
    for row in rows {
        let interval = if row.pending {
            format!("{}*", row.cell.text())
        } else {
            row.cell.text().to_string()
        };
        let last_checked = row
            .last_checked
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "Never".to_string());
        let _ = writeln!(
            out,
            "{:<url_width$}  {:>9}  {:<8}  {:<3}  {}",
            row.url(),
            interval,
            row.status_text(),
            row.toggle_label(),
            last_checked
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(enabled: bool, status: SiteStatus) -> SiteDetails {
        SiteDetails {
            url: "https://a.example".to_string(),
            interval: 30,
            enabled,
            status,
            last_checked: None,
        }
    }

    #[test]
    fn test_derived_displays_follow_confirmed_state() {
        let row = TargetRow::from_details(details(true, SiteStatus::Up));
        assert_eq!(row.status_text(), "UP");
        assert_eq!(row.row_class(), "up");

        let row = TargetRow::from_details(details(false, SiteStatus::Up));
        assert_eq!(row.status_text(), "PAUSED");
        assert_eq!(row.row_class(), "disabled");
        assert_eq!(row.toggle_label(), "off");
    }

    #[test]
    fn test_render_marks_pending_rows() {
        let mut row = TargetRow::from_details(details(true, SiteStatus::Unknown));
        row.pending = true;
        row.cell.show_pending(45);

        let table = render_table(&[row]);
        let line = table.lines().nth(1).unwrap();
        assert!(line.contains("https://a.example"));
        assert!(line.contains("45*"));
        assert!(line.contains("UNKNOWN"));
        assert!(line.ends_with("Never"));
    }
}
