//! Session-wide orchestration of background synchronization.
//!
//! The [`SyncCoordinator`] owns the background work of one session:
//! - a periodic quiet reconciliation pass
//! - an edge-triggered reconciliation when connectivity comes back
//! - a mirror that keeps [`SessionState`] in step with the Local Task Store
//!
//! It also fronts the user-initiated operations and turns their failures into
//! the banner text presentation shows.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::constants::{
    ERROR_LOAD_MORE_FAILED, ERROR_OFFLINE, ERROR_REFRESH_FAILED, ERROR_SYNC_FAILED, ERROR_TASK_CREATE_FAILED,
    ERROR_TASK_DELETE_FAILED, ERROR_TASK_UPDATE_FAILED,
};
use crate::entities::task;
use crate::sync::{PaginationState, ReconcileOutcome, SyncError, SyncService};

/// Aggregate state observed by presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub tasks: Vec<task::Model>,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub is_loading_more: bool,
    pub is_syncing: bool,
    pub is_offline: bool,
    pub pending_sync_count: u64,
    pub has_more_tasks: bool,
    pub current_offset: u64,
    /// Dismissible banner text for the last foreground failure
    pub error: Option<String>,
}

/// Coordinates synchronization for one session
pub struct SyncCoordinator {
    service: SyncService,
    state: Arc<watch::Sender<SessionState>>,
    sync_interval: Duration,
    cancel: CancellationToken,
    started: AtomicBool,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncCoordinator {
    /// Create a coordinator; nothing runs until [`start`](Self::start).
    pub fn new(service: SyncService, sync_interval: Duration) -> Self {
        let initial = SessionState {
            tasks: service.store().snapshot(),
            pending_sync_count: service.store().pending_count(),
            is_offline: !service.connectivity().is_connected_now(),
            ..SessionState::default()
        };
        let (state, _) = watch::channel(initial);

        Self {
            service,
            state: Arc::new(state),
            sync_interval,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
            handles: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(service: SyncService, config: &SyncConfig) -> Self {
        Self::new(service, config.auto_sync_interval())
    }

    pub fn service(&self) -> &SyncService {
        &self.service
    }

    /// Token cancelled when the session shuts down; child tokens suit session-owned helpers.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Current aggregate state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Live aggregate state.
    pub fn observe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Spawn the background loops. Only the first call per coordinator does anything.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        if self.started.swap(true, Ordering::AcqRel) {
            return false;
        }

        // Subscribe before spawning so no change between here and the first poll is missed.
        let store = self.service.store();
        let mut connectivity_rx = self.service.connectivity().observe();
        let initially_online = *connectivity_rx.borrow_and_update();
        let spawned = [
            tokio::spawn(mirror_store(
                store.observe_all(),
                store.observe_pending_count(),
                self.state.clone(),
                self.cancel.clone(),
            )),
            tokio::spawn(periodic_sync(
                self.service.clone(),
                self.state.clone(),
                self.cancel.clone(),
                self.sync_interval,
            )),
            tokio::spawn(watch_connectivity(
                connectivity_rx,
                initially_online,
                self.service.clone(),
                self.state.clone(),
                self.cancel.clone(),
            )),
        ];
        if let Ok(mut handles) = self.handles.lock() {
            handles.extend(spawned);
        }

        info!("Sync coordinator started (interval {:?})", self.sync_interval);
        true
    }

    /// Cancel every background loop and wait for them to stop.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handles: Vec<JoinHandle<()>> = match self.handles.lock() {
            Ok(mut handles) => handles.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {e}");
            }
        }
        info!("Sync coordinator stopped");
    }

    /// First load of the session.
    pub async fn load_initial(&self) {
        self.state.send_modify(|s| s.is_loading = true);
        let result = self.service.refresh().await;
        self.apply_first_page(result, |s| s.is_loading = false);
    }

    /// User-initiated refresh.
    pub async fn refresh(&self) {
        self.state.send_modify(|s| s.is_refreshing = true);
        let result = self.service.refresh().await;
        self.apply_first_page(result, |s| s.is_refreshing = false);
    }

    /// Fetch the next page, if any and if no fetch is already running.
    pub async fn load_more(&self) {
        let mut offset = None;
        self.state.send_if_modified(|s| {
            if !s.has_more_tasks || s.is_loading_more {
                return false;
            }
            s.is_loading_more = true;
            offset = Some(s.current_offset);
            true
        });
        let Some(offset) = offset else {
            return;
        };

        let result = self.service.load_more(offset).await;
        self.state.send_modify(|s| {
            s.is_loading_more = false;
            match result {
                Ok(page) => apply_pagination(s, page),
                Err(SyncError::Offline) => s.is_offline = true,
                Err(e) => s.error = Some(banner(ERROR_LOAD_MORE_FAILED, &e)),
            }
        });
    }

    pub async fn create_task(&self, title: &str, description: &str) -> Result<task::Model, SyncError> {
        let result = self.service.create_task(title, description).await;
        self.report(&result, ERROR_TASK_CREATE_FAILED);
        result
    }

    pub async fn update_task(&self, task: &task::Model) -> Result<task::Model, SyncError> {
        let result = self.service.update_task(task).await;
        self.report(&result, ERROR_TASK_UPDATE_FAILED);
        result
    }

    pub async fn toggle_task(&self, task: &task::Model) -> Result<task::Model, SyncError> {
        let result = self.service.toggle_completion(task).await;
        self.report(&result, ERROR_TASK_UPDATE_FAILED);
        result
    }

    pub async fn delete_task(&self, id: &str) -> Result<(), SyncError> {
        let result = self.service.delete_task(id).await;
        self.report(&result, ERROR_TASK_DELETE_FAILED);
        result
    }

    /// Explicit retry of pending changes; failures show a banner.
    pub async fn sync_now(&self) -> Result<ReconcileOutcome, SyncError> {
        let result = match run_reconcile(&self.service, &self.state, &self.cancel).await {
            Some(result) => result,
            None => return Ok(ReconcileOutcome::AlreadyRunning),
        };

        match &result {
            Ok(ReconcileOutcome::Completed(report)) if report.failed > 0 => {
                let message = format!("{ERROR_SYNC_FAILED}: {} task(s) still pending", report.failed);
                self.state.send_modify(|s| s.error = Some(message));
            }
            Ok(_) => {}
            Err(e) => {
                let message = banner(ERROR_SYNC_FAILED, e);
                self.state.send_modify(|s| s.error = Some(message));
            }
        }
        result
    }

    pub fn dismiss_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    fn apply_first_page(&self, result: Result<PaginationState, SyncError>, finish: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(|s| {
            finish(s);
            match result {
                Ok(page) => {
                    apply_pagination(s, page);
                    s.error = None;
                }
                // Offline is shown by the offline banner, not as an error.
                Err(SyncError::Offline) => {
                    s.is_offline = true;
                    s.error = None;
                }
                Err(e) => s.error = Some(banner(ERROR_REFRESH_FAILED, &e)),
            }
        });
    }

    fn report<T>(&self, result: &Result<T, SyncError>, prefix: &str) {
        if let Err(e) = result {
            let message = banner(prefix, e);
            self.state.send_modify(|s| s.error = Some(message));
        }
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn apply_pagination(state: &mut SessionState, page: PaginationState) {
    state.has_more_tasks = page.has_more;
    state.current_offset = page.offset;
}

fn banner(prefix: &str, error: &SyncError) -> String {
    match error {
        SyncError::Validation(message) => message.clone(),
        SyncError::Offline => ERROR_OFFLINE.to_string(),
        other => format!("{prefix}: {other}"),
    }
}

/// Run one reconciliation pass, flagging `is_syncing` around it.
///
/// Returns `None` if the session was cancelled mid-pass.
async fn run_reconcile(
    service: &SyncService,
    state: &watch::Sender<SessionState>,
    cancel: &CancellationToken,
) -> Option<Result<ReconcileOutcome, SyncError>> {
    state.send_modify(|s| s.is_syncing = true);
    let result = tokio::select! {
        _ = cancel.cancelled() => None,
        result = service.reconcile() => Some(result),
    };
    let still_syncing = service.is_syncing();
    state.send_modify(|s| s.is_syncing = still_syncing);
    result
}

/// Background pass: failures are logged, never shown.
async fn quiet_sync(service: &SyncService, state: &watch::Sender<SessionState>, cancel: &CancellationToken) {
    match run_reconcile(service, state, cancel).await {
        Some(Ok(ReconcileOutcome::Completed(report))) => {
            debug!("Quiet sync: {} synced, {} still pending", report.synced, report.failed)
        }
        Some(Ok(ReconcileOutcome::AlreadyRunning)) => debug!("Quiet sync skipped, pass already running"),
        Some(Err(e)) => warn!("Quiet sync failed: {e}"),
        None => debug!("Quiet sync cancelled"),
    }
}

async fn mirror_store(
    mut tasks_rx: watch::Receiver<Vec<task::Model>>,
    mut pending_rx: watch::Receiver<u64>,
    state: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
) {
    let tasks = tasks_rx.borrow_and_update().clone();
    let pending = *pending_rx.borrow_and_update();
    state.send_modify(|s| {
        s.tasks = tasks;
        s.pending_sync_count = pending;
    });

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = tasks_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let tasks = tasks_rx.borrow_and_update().clone();
                state.send_modify(|s| s.tasks = tasks);
            }
            changed = pending_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let pending = *pending_rx.borrow_and_update();
                state.send_modify(|s| s.pending_sync_count = pending);
            }
        }
    }
}

async fn periodic_sync(
    service: SyncService,
    state: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
    interval: Duration,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Periodic sync cancelled");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if service.connectivity().is_connected_now() && service.store().pending_count() > 0 && !service.is_syncing() {
            debug!("Periodic sync triggered");
            quiet_sync(&service, &state, &cancel).await;
        }
    }
}

enum ConnectivityEvent {
    Changed,
    PassFinished,
    Stopped,
}

/// Applies every connectivity change to [`SessionState`] as it arrives.
///
/// A regained connection with pending changes starts a quiet pass in its own
/// task. An edge seen while that pass runs is remembered and triggers one
/// more pass once it finishes, if still online with changes pending.
async fn watch_connectivity(
    mut rx: watch::Receiver<bool>,
    mut was_online: bool,
    service: SyncService,
    state: Arc<watch::Sender<SessionState>>,
    cancel: CancellationToken,
) {
    state.send_if_modified(|s| set_offline(s, !was_online));

    let mut pass: Option<JoinHandle<()>> = None;
    let mut rerun = false;

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => ConnectivityEvent::Stopped,
            changed = rx.changed() => match changed {
                Ok(()) => ConnectivityEvent::Changed,
                Err(_) => ConnectivityEvent::Stopped,
            },
            _ = finish(&mut pass), if pass.is_some() => ConnectivityEvent::PassFinished,
        };

        match event {
            ConnectivityEvent::Stopped => break,
            ConnectivityEvent::Changed => {
                let online = *rx.borrow_and_update();
                state.send_if_modified(|s| set_offline(s, !online));
                let regained = online && !was_online;
                was_online = online;

                if !regained || service.store().pending_count() == 0 {
                    continue;
                }
                if pass.is_some() {
                    debug!("Connectivity regained during a pass, syncing again after it");
                    rerun = true;
                } else {
                    info!("Connectivity regained with pending changes, syncing");
                    pass = Some(spawn_quiet_sync(&service, &state, &cancel));
                }
            }
            ConnectivityEvent::PassFinished => {
                pass = None;
                if std::mem::take(&mut rerun)
                    && service.connectivity().is_connected_now()
                    && service.store().pending_count() > 0
                {
                    info!("Connectivity changed during the last pass, syncing again");
                    pass = Some(spawn_quiet_sync(&service, &state, &cancel));
                }
            }
        }
    }

    finish(&mut pass).await;
}

fn spawn_quiet_sync(
    service: &SyncService,
    state: &Arc<watch::Sender<SessionState>>,
    cancel: &CancellationToken,
) -> JoinHandle<()> {
    let service = service.clone();
    let state = state.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move { quiet_sync(&service, &state, &cancel).await })
}

async fn finish(pass: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = pass {
        if let Err(e) = handle.await {
            warn!("Reconnect sync ended abnormally: {e}");
        }
    }
}

fn set_offline(state: &mut SessionState, offline: bool) -> bool {
    if state.is_offline == offline {
        return false;
    }
    state.is_offline = offline;
    true
}
