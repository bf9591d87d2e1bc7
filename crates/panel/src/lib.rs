//! Client side of the sitewatch admin panel.
//!
//! [`InlineConfigEditor`] keeps one row per monitored site and applies
//! interval edits, enabled toggles and deletes against the server,
//! showing edits optimistically and rolling them back when the server
//! does not confirm them.
pub mod api;
pub mod cell;
pub mod config;
pub mod editor;
pub mod error;
pub mod notify;
pub mod view;

pub use api::{HttpMonitorApi, MonitorApi};
pub use cell::{EditSession, IntervalCell};
pub use editor::{EditPolicy, InlineConfigEditor};
pub use error::EditError;
pub use notify::{Notifier, RecordingNotifier, StderrNotifier};
pub use view::TargetRow;
