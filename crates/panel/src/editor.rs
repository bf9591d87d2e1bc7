//! Optimistic inline editing of monitored sites.
//!
//! The editor owns one [`TargetRow`] per site, as last rendered from the
//! server. Edits are validated locally, shown right away, and sent to the
//! server; a confirmed change is followed by a refetch of the whole list,
//! a rejected one is rolled back to the confirmed value on the spot.
//!
//! Mutations are serialized per site: while one request for a url is in
//! flight, further mutations of that url are rejected with
//! [`EditError::Busy`].
use sitewatch_common::{
    parse_interval, AddSiteRequest, DeleteRequest, SiteDetails, SiteStatus, ToggleRequest,
    UpdateRequest,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::MonitorApi;
use crate::error::EditError;
use crate::notify::Notifier;
use crate::view::TargetRow;

/// Behaviour switches for the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditPolicy {
    /// Send `enabled: true` along with every interval edit, so that editing
    /// a paused site's interval also resumes monitoring it.
    pub enable_on_interval_edit: bool,
}

struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    url: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.url);
    }
}

pub struct InlineConfigEditor<A, N> {
    api: A,
    notifier: N,
    policy: EditPolicy,
    rows: RwLock<BTreeMap<String, TargetRow>>,
    in_flight: Mutex<HashSet<String>>,
}

impl<A: MonitorApi, N: Notifier> InlineConfigEditor<A, N> {
    /// Builds the editor and loads the current site list.
    pub async fn mount(api: A, notifier: N, policy: EditPolicy) -> Result<Self, EditError> {
        let editor = Self {
            api,
            notifier,
            policy,
            rows: RwLock::new(BTreeMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        };
        if let Err(e) = editor.refresh().await {
            editor.notifier.notify(&e.to_string());
            return Err(e);
        }
        let sites = editor.rows.read().await.len();
        info!(
            sites = sites,
            enable_on_interval_edit = policy.enable_on_interval_edit,
            "Panel mounted."
        );
        Ok(editor)
    }

    /// Tears the editor down, dropping all local state.
    pub fn unmount(self) {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len();
        if in_flight > 0 {
            warn!(in_flight = in_flight, "Unmounting with requests still in flight.");
        }
        info!("Panel unmounted.");
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    pub async fn rows(&self) -> Vec<TargetRow> {
        self.rows.read().await.values().cloned().collect()
    }

    pub async fn row(&self, url: &str) -> Option<TargetRow> {
        self.rows.read().await.get(url).cloned()
    }

    // --- Cell events ---

    pub async fn focus(&self, url: &str) -> Result<(), EditError> {
        self.with_row(url, |row| row.cell.focus()).await
    }

    pub async fn input(&self, url: &str, text: &str) -> Result<(), EditError> {
        self.with_row(url, |row| row.cell.input(text)).await
    }

    /// Enter: commits the edit and blurs the cell.
    pub async fn press_enter(&self, url: &str) -> Result<Option<u32>, EditError> {
        let session = self.with_row(url, |row| row.cell.press_enter()).await?;
        self.commit_session(url, session).await
    }

    /// Blur: commits the edit if one is still open.
    pub async fn blur(&self, url: &str) -> Result<Option<u32>, EditError> {
        let session = self.with_row(url, |row| row.cell.blur()).await?;
        self.commit_session(url, session).await
    }

    async fn commit_session(
        &self,
        url: &str,
        session: Option<crate::cell::EditSession>,
    ) -> Result<Option<u32>, EditError> {
        match session {
            Some(session) => self.commit_interval(url, &session.pending).await.map(Some),
            None => Ok(None),
        }
    }

    // --- Operations ---

    /// Validates `raw` and sends it as the site's new interval.
    ///
    /// Returns the confirmed interval. On any failure the cell shows the last
    /// confirmed interval again and the user is notified.
    pub async fn commit_interval(&self, url: &str, raw: &str) -> Result<u32, EditError> {
        if self.row(url).await.is_none() {
            return Err(self.fail(EditError::UnknownTarget(url.to_string())));
        }

        let value = match parse_interval(raw) {
            Ok(value) => value,
            Err(e) => {
                self.rollback_cell(url).await;
                return Err(self.fail(e.into()));
            }
        };

        let _guard = match self.begin(url) {
            Ok(guard) => guard,
            Err(e) => {
                self.rollback_cell(url).await;
                return Err(self.fail(e));
            }
        };

        self.with_row(url, |row| {
            row.cell.show_pending(value);
            row.pending = true;
        })
        .await?;

        let request = UpdateRequest {
            url: url.to_string(),
            interval: Some(value),
            enabled: self.policy.enable_on_interval_edit.then_some(true),
        };
        debug!(url = %url, interval = value, enabled = ?request.enabled, "Sending interval update.");
        let result = self.api.update(&request).await;

        {
            let mut rows = self.rows.write().await;
            if let Some(row) = rows.get_mut(url) {
                row.pending = false;
                match &result {
                    Ok(()) => {
                        row.cell.confirm(value);
                        if request.enabled == Some(true) {
                            row.enabled = true;
                        }
                    }
                    Err(_) => row.cell.rollback(),
                }
            }
        }

        match result {
            Ok(()) => {
                info!(url = %url, interval = value, "Interval confirmed.");
                self.resync().await;
                Ok(value)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Flips the site's enabled flag, starting from its confirmed state.
    ///
    /// Returns the new confirmed flag. Nothing changes locally before the
    /// server confirms.
    pub async fn toggle_enabled(&self, url: &str) -> Result<bool, EditError> {
        let current = match self.row(url).await {
            Some(row) => row.enabled,
            None => return Err(self.fail(EditError::UnknownTarget(url.to_string()))),
        };

        let _guard = self.begin(url).map_err(|e| self.fail(e))?;
        self.with_row(url, |row| row.pending = true).await?;

        let request = ToggleRequest {
            url: url.to_string(),
            enabled: !current,
        };
        let result = self.api.toggle_monitoring(&request).await;

        if let Some(row) = self.rows.write().await.get_mut(url) {
            row.pending = false;
            if result.is_ok() {
                row.enabled = request.enabled;
            }
        }

        match result {
            Ok(()) => {
                info!(url = %url, enabled = request.enabled, "Monitoring toggle confirmed.");
                self.resync().await;
                Ok(request.enabled)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Removes the site once the server confirms the delete.
    pub async fn delete_target(&self, url: &str) -> Result<(), EditError> {
        if self.row(url).await.is_none() {
            return Err(self.fail(EditError::UnknownTarget(url.to_string())));
        }

        let _guard = self.begin(url).map_err(|e| self.fail(e))?;
        self.with_row(url, |row| row.pending = true).await?;

        let request = DeleteRequest {
            url: url.to_string(),
        };
        let result = self.api.delete_site(&request).await;

        {
            let mut rows = self.rows.write().await;
            match &result {
                Ok(()) => {
                    rows.remove(url);
                }
                Err(_) => {
                    if let Some(row) = rows.get_mut(url) {
                        row.pending = false;
                    }
                }
            }
        }

        match result {
            Ok(()) => {
                info!(url = %url, "Site delete confirmed.");
                self.resync().await;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Adds a new site, enabled, with the given interval text.
    pub async fn add_target(&self, url: &str, raw_interval: &str) -> Result<(), EditError> {
        let interval = parse_interval(raw_interval).map_err(|e| self.fail(e.into()))?;
        let _guard = self.begin(url).map_err(|e| self.fail(e))?;

        let request = AddSiteRequest {
            url: url.to_string(),
            interval,
            enabled: None,
        };
        self.api
            .add_site(&request)
            .await
            .map_err(|e| self.fail(e))?;

        info!(url = %url, interval = interval, "Site added.");
        self.rows
            .write()
            .await
            .entry(url.to_string())
            .or_insert_with(|| {
                TargetRow::from_details(SiteDetails {
                    url: url.to_string(),
                    interval,
                    enabled: true,
                    status: SiteStatus::Unknown,
                    last_checked: None,
                })
            });
        self.resync().await;
        Ok(())
    }

    /// Refetches the site list and re-renders every row from it.
    pub async fn refresh(&self) -> Result<(), EditError> {
        let sites = self.api.list_sites().await?;

        let mut rows = self.rows.write().await;
        let mut next = BTreeMap::new();
        for details in sites {
            let row = match rows.remove(&details.url) {
                Some(mut row) => {
                    row.apply(details);
                    row
                }
                None => TargetRow::from_details(details),
            };
            next.insert(row.url().to_string(), row);
        }
        *rows = next;
        debug!(sites = rows.len(), "View refreshed from server.");
        Ok(())
    }

    // --- Helpers ---

    // Refetch after a confirmed mutation. The row was already patched with
    // the confirmed value, so a failed refetch only leaves statuses stale.
    async fn resync(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Refresh after confirmed change failed; keeping local state.");
        }
    }

    fn begin(&self, url: &str) -> Result<InFlightGuard<'_>, EditError> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(url.to_string()) {
            return Err(EditError::Busy(url.to_string()));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            url: url.to_string(),
        })
    }

    async fn with_row<T>(
        &self,
        url: &str,
        f: impl FnOnce(&mut TargetRow) -> T,
    ) -> Result<T, EditError> {
        let mut rows = self.rows.write().await;
        rows.get_mut(url)
            .map(f)
            .ok_or_else(|| EditError::UnknownTarget(url.to_string()))
    }

    async fn rollback_cell(&self, url: &str) {
        if let Some(row) = self.rows.write().await.get_mut(url) {
            row.cell.rollback();
        }
    }

    fn fail(&self, err: EditError) -> EditError {
        warn!(error = %err, "Panel operation failed.");
        self.notifier.notify(&err.to_string());
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use async_trait::async_trait;
    use sitewatch_common::MonitoredTarget;
    use tokio::sync::oneshot;

    const URL: &str = "https://a.example";

    #[derive(Default)]
    struct FakeApi {
        sites: Mutex<BTreeMap<String, MonitoredTarget>>,
        updates: Mutex<Vec<UpdateRequest>>,
        toggles: Mutex<Vec<ToggleRequest>>,
        deletes: Mutex<Vec<DeleteRequest>>,
        fail_next: Mutex<Option<EditError>>,
        hold_next: Mutex<Option<oneshot::Receiver<()>>>,
        list_fails: Mutex<bool>,
    }

    impl FakeApi {
        fn with_site(url: &str, interval: u32, enabled: bool) -> Self {
            let api = Self::default();
            api.sites.lock().unwrap().insert(
                url.to_string(),
                MonitoredTarget {
                    url: url.to_string(),
                    interval,
                    enabled,
                },
            );
            api
        }

        fn fail_next(&self, err: EditError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn hold_next(&self, rx: oneshot::Receiver<()>) {
            *self.hold_next.lock().unwrap() = Some(rx);
        }

        fn update_count(&self) -> usize {
            self.updates.lock().unwrap().len()
        }

        // Waits on a held request, then pops a scripted failure if any.
        async fn gate(&self) -> Result<(), EditError> {
            let hold = self.hold_next.lock().unwrap().take();
            if let Some(rx) = hold {
                let _ = rx.await;
            }
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl MonitorApi for FakeApi {
        async fn list_sites(&self) -> Result<Vec<SiteDetails>, EditError> {
            if *self.list_fails.lock().unwrap() {
                return Err(EditError::Transport("connection refused".to_string()));
            }
            Ok(self
                .sites
                .lock()
                .unwrap()
                .values()
                .map(|t| SiteDetails {
                    url: t.url.clone(),
                    interval: t.interval,
                    enabled: t.enabled,
                    status: SiteStatus::Up,
                    last_checked: None,
                })
                .collect())
        }

        async fn update(&self, request: &UpdateRequest) -> Result<(), EditError> {
            self.updates.lock().unwrap().push(request.clone());
            self.gate().await?;
            let mut sites = self.sites.lock().unwrap();
            let site = sites
                .get_mut(&request.url)
                .ok_or_else(|| EditError::Application("Site not found".to_string()))?;
            if let Some(interval) = request.interval {
                site.interval = interval;
            }
            if let Some(enabled) = request.enabled {
                site.enabled = enabled;
            }
            Ok(())
        }

        async fn toggle_monitoring(&self, request: &ToggleRequest) -> Result<(), EditError> {
            self.toggles.lock().unwrap().push(request.clone());
            self.gate().await?;
            if let Some(site) = self.sites.lock().unwrap().get_mut(&request.url) {
                site.enabled = request.enabled;
            }
            Ok(())
        }

        async fn delete_site(&self, request: &DeleteRequest) -> Result<(), EditError> {
            self.deletes.lock().unwrap().push(request.clone());
            self.gate().await?;
            self.sites.lock().unwrap().remove(&request.url);
            Ok(())
        }

        async fn add_site(&self, request: &AddSiteRequest) -> Result<(), EditError> {
            self.gate().await?;
            self.sites.lock().unwrap().insert(
                request.url.clone(),
                MonitoredTarget {
                    url: request.url.clone(),
                    interval: request.interval,
                    enabled: request.enabled.unwrap_or(true),
                },
            );
            Ok(())
        }
    }

    async fn mount(api: FakeApi) -> InlineConfigEditor<FakeApi, RecordingNotifier> {
        InlineConfigEditor::mount(api, RecordingNotifier::new(), EditPolicy::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_enter_sends_one_update_and_confirms() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        editor.focus(URL).await.unwrap();
        editor.input(URL, "45").await.unwrap();
        assert_eq!(editor.press_enter(URL).await.unwrap(), Some(45));
        // The blur that follows Enter must not commit again.
        assert_eq!(editor.blur(URL).await.unwrap(), None);

        let updates = editor.api().updates.lock().unwrap().clone();
        assert_eq!(
            updates,
            vec![UpdateRequest {
                url: URL.to_string(),
                interval: Some(45),
                enabled: None,
            }]
        );

        let row = editor.row(URL).await.unwrap();
        assert_eq!(row.cell.text(), "45");
        assert_eq!(row.cell.confirmed(), 45);
        assert!(!row.pending);
        assert!(editor.notifier().is_empty());
    }

    #[tokio::test]
    async fn test_every_positive_integer_is_sent_as_is() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        for n in [1u32, 7, 45, 3600, u32::MAX] {
            editor.input(URL, &n.to_string()).await.unwrap();
            assert_eq!(editor.blur(URL).await.unwrap(), Some(n));
            let last = editor.api().updates.lock().unwrap().last().cloned().unwrap();
            assert_eq!(last.interval, Some(n));
        }
        assert_eq!(editor.api().update_count(), 5);
    }

    #[tokio::test]
    async fn test_invalid_input_rolls_back_without_request() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        for raw in ["-5", "0", "abc", "", "1.5", "  "] {
            editor.focus(URL).await.unwrap();
            editor.input(URL, raw).await.unwrap();
            let err = editor.blur(URL).await.unwrap_err();
            assert!(matches!(err, EditError::Validation(_)), "{raw}: {err:?}");

            let row = editor.row(URL).await.unwrap();
            assert_eq!(row.cell.text(), "30", "display after {raw:?}");
            assert_eq!(row.cell.confirmed(), 30);
        }

        assert_eq!(editor.api().update_count(), 0);
        assert_eq!(editor.notifier().len(), 6);
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_confirmed_value() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        editor
            .api()
            .fail_next(EditError::Application("Interval locked".to_string()));
        editor.input(URL, "45").await.unwrap();
        let err = editor.press_enter(URL).await.unwrap_err();
        assert_eq!(err, EditError::Application("Interval locked".to_string()));

        let row = editor.row(URL).await.unwrap();
        assert_eq!(row.cell.confirmed(), 30);
        assert_eq!(row.cell.text(), "30");
        assert!(!row.pending);
        assert_eq!(editor.notifier().messages(), vec!["Interval locked".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_confirmed_value() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        editor
            .api()
            .fail_next(EditError::Transport("connection reset".to_string()));
        let err = editor.commit_interval(URL, "45").await.unwrap_err();
        assert!(matches!(err, EditError::Transport(_)));
        assert_eq!(editor.row(URL).await.unwrap().cell.confirmed(), 30);
        assert_eq!(editor.notifier().len(), 1);
    }

    #[tokio::test]
    async fn test_enable_on_edit_policy_is_explicit() {
        let editor = InlineConfigEditor::mount(
            FakeApi::with_site(URL, 30, false),
            RecordingNotifier::new(),
            EditPolicy {
                enable_on_interval_edit: true,
            },
        )
        .await
        .unwrap();

        editor.commit_interval(URL, "45").await.unwrap();
        let last = editor.api().updates.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.enabled, Some(true));
        assert!(editor.row(URL).await.unwrap().enabled);

        // Default policy leaves the flag alone.
        let editor = mount(FakeApi::with_site(URL, 30, false)).await;
        editor.commit_interval(URL, "45").await.unwrap();
        let last = editor.api().updates.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.enabled, None);
        assert!(!editor.row(URL).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_toggle_twice_is_identity() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        assert!(!editor.toggle_enabled(URL).await.unwrap());
        assert_eq!(editor.row(URL).await.unwrap().status_text(), "PAUSED");
        assert!(editor.toggle_enabled(URL).await.unwrap());

        let toggles = editor.api().toggles.lock().unwrap().clone();
        assert_eq!(toggles.len(), 2);
        assert!(!toggles[0].enabled);
        assert!(toggles[1].enabled);
        assert!(editor.row(URL).await.unwrap().enabled);
    }

    #[tokio::test]
    async fn test_failed_toggle_changes_nothing() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        editor
            .api()
            .fail_next(EditError::Application("nope".to_string()));
        assert!(editor.toggle_enabled(URL).await.is_err());
        let row = editor.row(URL).await.unwrap();
        assert!(row.enabled);
        assert!(!row.pending);
        assert_eq!(editor.notifier().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_success_and_rejection() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;

        editor
            .api()
            .fail_next(EditError::Application("Site is protected".to_string()));
        assert!(editor.delete_target(URL).await.is_err());
        assert!(editor.row(URL).await.is_some());

        editor.delete_target(URL).await.unwrap();
        assert!(editor.row(URL).await.is_none());
        assert!(editor.rows().await.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_edit_is_rejected() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;
        let (release_tx, release_rx) = oneshot::channel();
        editor.api().hold_next(release_rx);

        let first = editor.commit_interval(URL, "45");
        let second = async {
            while !editor.row(URL).await.unwrap().pending {
                tokio::task::yield_now().await;
            }
            let result = editor.commit_interval(URL, "50").await;
            let _ = release_tx.send(());
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Ok(45));
        assert_eq!(second, Err(EditError::Busy(URL.to_string())));
        assert_eq!(editor.api().update_count(), 1);
        assert_eq!(editor.row(URL).await.unwrap().cell.confirmed(), 45);
    }

    #[tokio::test]
    async fn test_unknown_target_is_reported() {
        let editor = mount(FakeApi::default()).await;
        let err = editor
            .commit_interval("https://missing.example", "10")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EditError::UnknownTarget("https://missing.example".to_string())
        );
        assert_eq!(editor.api().update_count(), 0);
    }

    #[tokio::test]
    async fn test_add_target_shows_new_row() {
        let editor = mount(FakeApi::default()).await;

        assert!(matches!(
            editor.add_target(URL, "zero").await,
            Err(EditError::Validation(_))
        ));
        editor.add_target(URL, "60").await.unwrap();

        let row = editor.row(URL).await.unwrap();
        assert_eq!(row.cell.confirmed(), 60);
        assert!(row.enabled);
    }

    #[tokio::test]
    async fn test_confirmed_edit_survives_failed_refresh() {
        let editor = mount(FakeApi::with_site(URL, 30, true)).await;
        *editor.api().list_fails.lock().unwrap() = true;

        assert_eq!(editor.commit_interval(URL, "45").await, Ok(45));
        assert_eq!(editor.row(URL).await.unwrap().cell.text(), "45");
        assert!(editor.notifier().is_empty());
    }

    #[tokio::test]
    async fn test_mount_failure_is_notified() {
        let api = FakeApi::default();
        *api.list_fails.lock().unwrap() = true;
        let notifier = RecordingNotifier::new();
        let result = InlineConfigEditor::mount(api, notifier, EditPolicy::default()).await;
        assert!(matches!(result, Err(EditError::Transport(_))));
    }
}
