pub mod interval;
pub mod models;

pub use interval::{parse_interval, validate_interval, IntervalError};
pub use models::{
    AddSiteRequest, ApiResponse, DeleteRequest, MonitoredTarget, SiteDetails, SiteStatus,
    ToggleRequest, UpdateRequest,
};
