//! Shared test helpers: an instrumented in-memory object store and
//! local-tree builders.
#![allow(dead_code)]

use async_trait::async_trait;
use dogedeploy_cloud::object_store::ByteStream;
use dogedeploy_cloud::{CloudError, CloudResult, ObjectStore};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Store calls in the order they started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put(String),
    Delete(String),
    List,
}

/// In-memory bucket that records calls and concurrency.
pub struct MockStore {
    bucket: String,
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub calls: Mutex<Vec<StoreCall>>,
    /// Remaining failures per key before `put` succeeds; `usize::MAX` never succeeds.
    put_failures: Mutex<HashMap<String, usize>>,
    delete_failures: HashSet<String>,
    /// Keys whose put or delete fails with a rejected-token API error.
    auth_failures: HashSet<String>,
    list_fails: bool,
    list_auth_fails: bool,
    prepare_fails: bool,
    op_delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub put_attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            bucket: "test-bucket".to_string(),
            objects: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            put_failures: Mutex::new(HashMap::new()),
            delete_failures: HashSet::new(),
            auth_failures: HashSet::new(),
            list_fails: false,
            list_auth_fails: false,
            prepare_fails: false,
            op_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            put_attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Pre-populates remote objects.
    pub fn with_objects(self, keys: &[&str]) -> Self {
        {
            let mut objects = self.objects.lock().unwrap();
            for key in keys {
                objects.insert(key.to_string(), (Vec::new(), "text/plain".to_string()));
            }
        }
        self
    }

    pub fn failing_put(self, key: &str, times: usize) -> Self {
        self.put_failures
            .lock()
            .unwrap()
            .insert(key.to_string(), times);
        self
    }

    pub fn failing_delete(mut self, key: &str) -> Self {
        self.delete_failures.insert(key.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Operations on `key` fail as if the temporary token were rejected.
    pub fn rejecting_token_for(mut self, key: &str) -> Self {
        self.auth_failures.insert(key.to_string());
        self
    }

    pub fn rejecting_token_on_list(mut self) -> Self {
        self.list_auth_fails = true;
        self
    }

    pub fn failing_prepare(mut self) -> Self {
        self.prepare_fails = true;
        self
    }

    /// Every operation sleeps this long while counted as in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.op_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn put_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Put(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn delete_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Delete(k) => Some(k),
                _ => None,
            })
            .collect()
    }

    pub fn attempts_for(&self, key: &str) -> Vec<Instant> {
        self.put_attempts
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn max_concurrency_seen(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.op_delay.is_zero() {
            tokio::time::sleep(self.op_delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn rejected_token() -> CloudError {
    CloudError::Api {
        code: 401,
        message: "API Error: invalid access key".to_string(),
    }
}

#[async_trait]
impl ObjectStore for MockStore {
    async fn prepare(&self) -> CloudResult<()> {
        if self.prepare_fails {
            return Err(rejected_token());
        }
        Ok(())
    }

    async fn put(&self, key: &str, body: ByteStream, content_type: &str) -> CloudResult<String> {
        self.calls.lock().unwrap().push(StoreCall::Put(key.to_string()));
        self.put_attempts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(Instant::now());

        self.enter().await;
        if self.auth_failures.contains(key) {
            self.leave();
            return Err(rejected_token());
        }
        let fail = {
            let mut failures = self.put_failures.lock().unwrap();
            match failures.get_mut(key) {
                Some(remaining) if *remaining > 0 => {
                    if *remaining != usize::MAX {
                        *remaining -= 1;
                    }
                    true
                }
                _ => false,
            }
        };
        self.leave();

        if fail {
            return Err(CloudError::Upload {
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }

        let body = body
            .collect()
            .await
            .map_err(|e| CloudError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?
            .into_bytes()
            .to_vec();
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (body, content_type.to_string()));
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str) -> CloudResult<()> {
        self.calls.lock().unwrap().push(StoreCall::Delete(key.to_string()));
        self.enter().await;
        self.leave();

        if self.auth_failures.contains(key) {
            return Err(rejected_token());
        }
        if self.delete_failures.contains(key) {
            return Err(CloudError::Delete {
                key: key.to_string(),
                message: "injected failure".to_string(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_all_keys(&self) -> CloudResult<Vec<String>> {
        self.calls.lock().unwrap().push(StoreCall::List);
        if self.list_fails {
            return Err(CloudError::List("injected failure".to_string()));
        }
        if self.list_auth_fails {
            return Err(rejected_token());
        }
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }
}

/// Writes `files` (relative path, contents) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
