#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tasksync::backend::{
    CreateTaskArgs, GatewayError, PageInfo, RemoteTask, TaskGateway, TaskPage, UpdateTaskArgs,
};
use tasksync::connectivity::Connectivity;
use tasksync::storage::{LocalStorage, TaskStore};
use tasksync::sync::SyncService;
use tasksync::task;
use tasksync::SyncStatus;

pub const PAGE_SIZE: u64 = 20;

/// In-memory stand-in for the REST service, with failure injection.
#[derive(Default)]
pub struct FakeGateway {
    tasks: Mutex<BTreeMap<u64, RemoteTask>>,
    next_id: Mutex<u64>,
    fail_all: AtomicBool,
    failing_ids: Mutex<HashSet<String>>,
    failing_titles: Mutex<HashSet<String>>,
    delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        let gateway = Self::default();
        *gateway.next_id.lock().unwrap() = 1;
        Arc::new(gateway)
    }

    /// Put a task on the server directly.
    pub fn seed(&self, title: &str) -> RemoteTask {
        let id = self.allocate_id();
        let task = RemoteTask {
            id,
            title: title.to_string(),
            body: String::new(),
            completed: false,
            user_id: 1,
            created_at: 1_000 + id as i64,
            updated_at: 1_000 + id as i64,
        };
        self.tasks.lock().unwrap().insert(id, task.clone());
        task
    }

    pub fn set_next_id(&self, id: u64) {
        *self.next_id.lock().unwrap() = id;
    }

    pub fn remove(&self, id: u64) {
        self.tasks.lock().unwrap().remove(&id);
    }

    pub fn server_task(&self, id: u64) -> Option<RemoteTask> {
        self.tasks.lock().unwrap().get(&id).cloned()
    }

    pub fn server_len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_all.store(failing, Ordering::SeqCst);
    }

    /// Make every call on this id fail.
    pub fn fail_id(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    /// Make creates with this title fail.
    pub fn fail_title(&self, title: &str) {
        self.failing_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn allocate_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }

    async fn enter(&self, call: String, id: Option<&str>) -> Result<(), GatewayError> {
        self.calls.lock().unwrap().push(call);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(GatewayError::Network("connection refused".to_string()));
        }
        if let Some(id) = id {
            if self.failing_ids.lock().unwrap().contains(id) {
                return Err(GatewayError::Status {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
        }
        Ok(())
    }

    fn parse_id(remote_id: &str) -> Result<u64, GatewayError> {
        remote_id
            .parse()
            .map_err(|_| GatewayError::NotFound(remote_id.to_string()))
    }
}

#[async_trait]
impl TaskGateway for FakeGateway {
    fn gateway_type(&self) -> &str {
        "fake"
    }

    async fn fetch_page(&self, limit: u64, offset: u64) -> Result<TaskPage, GatewayError> {
        self.enter(format!("list {offset}"), None).await?;
        let tasks = self.tasks.lock().unwrap();
        let total = tasks.len() as u64;
        let data = tasks
            .values()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(TaskPage {
            data,
            pagination: PageInfo {
                total,
                limit,
                offset,
                has_more: offset + limit < total,
            },
        })
    }

    async fn fetch_task(&self, remote_id: &str) -> Result<RemoteTask, GatewayError> {
        self.enter(format!("get {remote_id}"), Some(remote_id)).await?;
        let id = Self::parse_id(remote_id)?;
        self.server_task(id)
            .ok_or_else(|| GatewayError::NotFound(remote_id.to_string()))
    }

    async fn create_task(&self, args: CreateTaskArgs) -> Result<RemoteTask, GatewayError> {
        self.enter(format!("create {}", args.title), None).await?;
        if self.failing_titles.lock().unwrap().contains(&args.title) {
            return Err(GatewayError::Timeout("create timed out".to_string()));
        }
        let id = self.allocate_id();
        let task = RemoteTask {
            id,
            title: args.title,
            body: args.description,
            completed: false,
            user_id: 1,
            created_at: 5_000,
            updated_at: 5_000,
        };
        self.tasks.lock().unwrap().insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, remote_id: &str, args: UpdateTaskArgs) -> Result<RemoteTask, GatewayError> {
        self.enter(format!("update {remote_id}"), Some(remote_id)).await?;
        let id = Self::parse_id(remote_id)?;
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(&id)
            .ok_or_else(|| GatewayError::NotFound(remote_id.to_string()))?;
        if let Some(title) = args.title {
            task.title = title;
        }
        if let Some(body) = args.description {
            task.body = body;
        }
        if let Some(completed) = args.completed {
            task.completed = completed;
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, remote_id: &str) -> Result<(), GatewayError> {
        self.enter(format!("delete {remote_id}"), Some(remote_id)).await?;
        let id = Self::parse_id(remote_id)?;
        self.tasks
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(remote_id.to_string()))
    }
}

pub async fn new_store() -> Arc<TaskStore> {
    let storage = LocalStorage::in_memory().await.unwrap();
    Arc::new(TaskStore::new(storage).await.unwrap())
}

/// Service over a fresh in-memory store and a fake server.
pub async fn setup(online: bool) -> (SyncService, Arc<FakeGateway>, Connectivity) {
    let gateway = FakeGateway::new();
    let connectivity = Connectivity::new(online);
    let service = SyncService::new(new_store().await, gateway.clone(), connectivity.clone(), PAGE_SIZE);
    (service, gateway, connectivity)
}

pub fn local_task(id: &str, title: &str, status: SyncStatus) -> task::Model {
    task::Model {
        id: id.to_string(),
        title: title.to_string(),
        description: String::new(),
        is_completed: false,
        sync_status: status,
        created_at: 100,
        updated_at: 100,
    }
}

/// Store a server-known task locally as `SYNCED`, mirroring a previous refresh.
pub async fn seed_synced(service: &SyncService, gateway: &FakeGateway, title: &str) -> task::Model {
    let remote = gateway.seed(title);
    let local = remote.into_local();
    service.store().upsert(&local).await.unwrap();
    local
}
