//! Server-side checker tasks for monitored sites.
use reqwest::{Client, StatusCode};
use sitewatch_common::SiteStatus;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::store::{SiteStore, StatusBoard};

/// What has to change to bring the running tasks in line with the store.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub stop: Vec<String>,
    pub start: Vec<(String, u32)>,
    pub restart: Vec<(String, u32)>,
}

/// Compares running tasks (url -> interval) with the desired set.
pub fn plan_reconcile(
    running: &HashMap<String, u32>,
    desired: &HashMap<String, u32>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for url in running.keys() {
        if !desired.contains_key(url) {
            plan.stop.push(url.clone());
        }
    }

    for (url, interval) in desired {
        match running.get(url) {
            None => plan.start.push((url.clone(), *interval)),
            Some(current) if current != interval => plan.restart.push((url.clone(), *interval)),
            Some(_) => {}
        }
    }

    plan.stop.sort();
    plan.start.sort();
    plan.restart.sort();
    plan
}

/// Runs one HTTP check task per enabled site.
pub struct MonitorManager {
    store: Arc<SiteStore>,
    board: StatusBoard,
    client: Client,
    // url -> (task handle, shutdown sender, interval the task was started with)
    running_tasks: HashMap<String, (JoinHandle<()>, oneshot::Sender<()>, u32)>,
}

impl MonitorManager {
    pub fn new(
        store: Arc<SiteStore>,
        board: StatusBoard,
        check_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(check_timeout).build()?;
        Ok(Self {
            store,
            board,
            client,
            running_tasks: HashMap::new(),
        })
    }

    /// Reconciles on every trigger, and on a fixed resync period in case a
    /// trigger was missed.
    pub async fn run(
        mut self,
        mut trigger_rx: mpsc::Receiver<()>,
        resync_every: Duration,
        mut shutdown_rx: watch::Receiver<()>,
    ) {
        let mut resync = tokio::time::interval(resync_every);
        info!(
            resync_seconds = resync_every.as_secs(),
            "Monitor manager started."
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping all checker tasks.");
                    break;
                }

                msg = trigger_rx.recv() => {
                    if msg.is_none() {
                        warn!("Reconcile trigger channel closed, stopping monitor manager.");
                        break;
                    }
                    // Collapse bursts of triggers into one pass.
                    while trigger_rx.try_recv().is_ok() {}
                    self.reconcile();
                }

                _ = resync.tick() => {
                    debug!("Periodic resync.");
                    self.reconcile();
                }
            }
        }

        self.stop_all().await;
        info!("Monitor manager gracefully shut down.");
    }

    pub fn reconcile(&mut self) {
        let desired: HashMap<String, u32> = self
            .store
            .list()
            .into_iter()
            .filter(|t| t.enabled)
            .map(|t| (t.url, t.interval))
            .collect();
        let running: HashMap<String, u32> = self
            .running_tasks
            .iter()
            .map(|(url, (_, _, interval))| (url.clone(), *interval))
            .collect();

        let plan = plan_reconcile(&running, &desired);

        for url in plan.stop {
            info!(url = %url, "Stopping checker task.");
            self.stop_task(&url);
            // Disabled sites keep their last status; deleted ones lose it.
            if self.store.get(&url).is_none() {
                self.board.clear(&url);
            }
        }

        for (url, interval) in plan.restart {
            info!(url = %url, interval = interval, "Restarting checker task with new interval.");
            self.stop_task(&url);
            self.start_task(url, interval);
        }

        for (url, interval) in plan.start {
            info!(url = %url, interval = interval, "Starting checker task.");
            self.start_task(url, interval);
        }

        // Statuses of sites deleted while not running (e.g. disabled first).
        let stale: Vec<String> = self
            .board
            .urls()
            .into_iter()
            .filter(|url| self.store.get(url).is_none())
            .collect();
        for url in stale {
            self.board.clear(&url);
        }
    }

    pub fn running_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.running_tasks.keys().cloned().collect();
        urls.sort();
        urls
    }

    fn start_task(&mut self, url: String, interval: u32) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run_http_check(
            url.clone(),
            interval,
            self.client.clone(),
            self.store.clone(),
            self.board.clone(),
            shutdown_rx,
        ));
        self.running_tasks
            .insert(url, (handle, shutdown_tx, interval));
    }

    fn stop_task(&mut self, url: &str) -> Option<JoinHandle<()>> {
        let (handle, shutdown_tx, _) = self.running_tasks.remove(url)?;
        if shutdown_tx.send(()).is_err() {
            warn!(url = %url, "Failed to send shutdown signal to checker task; it might have already finished.");
        }
        Some(handle)
    }

    // Signals every task, then waits for all of them to exit.
    async fn stop_all(&mut self) {
        let urls: Vec<String> = self.running_tasks.keys().cloned().collect();
        let handles: Vec<JoinHandle<()>> =
            urls.iter().filter_map(|url| self.stop_task(url)).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Checker task ended abnormally.");
            }
        }
    }
}

async fn run_http_check(
    url: String,
    interval_seconds: u32,
    client: Client,
    store: Arc<SiteStore>,
    board: StatusBoard,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(u64::from(interval_seconds.max(1))));

    'checks: loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                debug!(url = %url, "Checker task received shutdown signal.");
                break 'checks;
            }
            _ = interval.tick() => {
                let status = tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        debug!(url = %url, "Checker task stopped during a check.");
                        break 'checks;
                    }
                    status = check_site(&client, &url) => status,
                };
                // Deleted while the check was running.
                if store.get(&url).is_none() {
                    debug!(url = %url, "Site no longer exists, dropping check result.");
                    break 'checks;
                }
                board.record(&url, status);
                info!(url = %url, status = %status, "Site checked.");
            }
        }
    }
}

/// A site is up only when it answers 200.
pub async fn check_site(client: &Client, url: &str) -> SiteStatus {
    match client.get(url).send().await {
        Ok(response) if response.status() == StatusCode::OK => SiteStatus::Up,
        Ok(response) => {
            debug!(url = %url, status = %response.status(), "Site answered with a non-200 status.");
            SiteStatus::Down
        }
        Err(e) => {
            if e.is_timeout() {
                error!(url = %url, "Check timed out.");
            } else {
                error!(url = %url, error = %e, "Check failed.");
            }
            SiteStatus::Down
        }
    }
}
