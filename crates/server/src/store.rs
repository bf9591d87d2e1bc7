//! In-memory site store and the status board written by checker tasks.
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sitewatch_common::{MonitoredTarget, SiteDetails, SiteStatus};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Site not found: {0}")]
    NotFound(String),
    #[error("Site already exists: {0}")]
    AlreadyExists(String),
}

/// Fields to change on an existing target. `None` leaves a field as is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetPatch {
    pub interval: Option<u32>,
    pub enabled: Option<bool>,
}

#[derive(Default, Debug)]
pub struct SiteStore {
    sites: DashMap<String, MonitoredTarget>,
}

impl SiteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_sites(sites: impl IntoIterator<Item = MonitoredTarget>) -> Arc<Self> {
        let store = Self::default();
        for site in sites {
            store.sites.insert(site.url.clone(), site);
        }
        Arc::new(store)
    }

    /// All targets, sorted by url.
    pub fn list(&self) -> Vec<MonitoredTarget> {
        let mut sites: Vec<MonitoredTarget> =
            self.sites.iter().map(|entry| entry.value().clone()).collect();
        sites.sort_by(|a, b| a.url.cmp(&b.url));
        sites
    }

    pub fn get(&self, url: &str) -> Option<MonitoredTarget> {
        self.sites.get(url).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, target: MonitoredTarget) -> Result<(), StoreError> {
        match self.sites.entry(target.url.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(target.url)),
            Entry::Vacant(slot) => {
                slot.insert(target);
                Ok(())
            }
        }
    }

    pub fn update(&self, url: &str, patch: TargetPatch) -> Result<MonitoredTarget, StoreError> {
        let mut entry = self
            .sites
            .get_mut(url)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
        if let Some(interval) = patch.interval {
            entry.interval = interval;
        }
        if let Some(enabled) = patch.enabled {
            entry.enabled = enabled;
        }
        Ok(entry.value().clone())
    }

    /// Patches the target, or creates it when the patch carries an interval.
    /// Returns the stored target and whether it was created.
    pub fn upsert(
        &self,
        url: &str,
        patch: TargetPatch,
    ) -> Result<(MonitoredTarget, bool), StoreError> {
        match self.sites.entry(url.to_string()) {
            Entry::Occupied(mut slot) => {
                let target = slot.get_mut();
                if let Some(interval) = patch.interval {
                    target.interval = interval;
                }
                if let Some(enabled) = patch.enabled {
                    target.enabled = enabled;
                }
                Ok((target.clone(), false))
            }
            Entry::Vacant(slot) => {
                let interval = patch
                    .interval
                    .ok_or_else(|| StoreError::NotFound(url.to_string()))?;
                let target = MonitoredTarget {
                    url: url.to_string(),
                    interval,
                    enabled: patch.enabled.unwrap_or(true),
                };
                slot.insert(target.clone());
                Ok((target, true))
            }
        }
    }

    pub fn remove(&self, url: &str) -> Result<MonitoredTarget, StoreError> {
        self.sites
            .remove(url)
            .map(|(_, target)| target)
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteHealth {
    pub status: SiteStatus,
    pub last_checked: DateTime<Utc>,
}

/// Latest check result per url.
#[derive(Clone, Default, Debug)]
pub struct StatusBoard {
    entries: Arc<DashMap<String, SiteHealth>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: &str, status: SiteStatus) {
        self.entries.insert(
            url.to_string(),
            SiteHealth {
                status,
                last_checked: Utc::now(),
            },
        );
    }

    pub fn get(&self, url: &str) -> Option<SiteHealth> {
        self.entries.get(url).map(|entry| *entry.value())
    }

    pub fn clear(&self, url: &str) {
        self.entries.remove(url);
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Joins a target with its latest check result.
    pub fn details_for(&self, target: MonitoredTarget) -> SiteDetails {
        let health = self.get(&target.url);
        SiteDetails {
            url: target.url,
            interval: target.interval,
            enabled: target.enabled,
            status: health.map(|h| h.status).unwrap_or_default(),
            last_checked: health.map(|h| h.last_checked),
        }
    }
}
