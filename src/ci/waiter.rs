//! Deduplicated, single-worker queue of build watches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info};

use super::job::{BuildJob, WatchOptions};
use super::result::WorkflowResult;
use super::watch::watch_build;
use crate::github::{ActionsApi, RepoSlug};

/// Future handed to every caller waiting on the same `(repo, sha)`.
///
/// All clones resolve to the same `Arc<WorkflowResult>`.
pub type BuildFuture = Shared<BoxFuture<'static, Arc<WorkflowResult>>>;

type PendingKey = (RepoSlug, String);

struct Pending {
    future: BuildFuture,
    reply: oneshot::Sender<Arc<WorkflowResult>>,
}

type PendingMap = Arc<Mutex<HashMap<PendingKey, Pending>>>;

/// The watch the worker is currently awaiting. Once `closed`, no new watch
/// may be spawned.
#[derive(Default)]
struct WatchSlot {
    closed: bool,
    handle: Option<AbortHandle>,
}

type ActiveWatch = Arc<Mutex<WatchSlot>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn resolved(result: WorkflowResult) -> BuildFuture {
    futures::future::ready(Arc::new(result)).boxed().shared()
}

struct Inner {
    pending: PendingMap,
    jobs: Mutex<Option<mpsc::UnboundedSender<BuildJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    active: ActiveWatch,
}

/// Watches CI builds one at a time, in submission order.
///
/// Submitting a commit that is already queued or being watched returns the
/// existing future instead of queueing a second job. Once a watch resolves
/// its entry is forgotten, so a later submission of the same commit starts a
/// fresh watch.
///
/// Cloning is cheap; all clones share one queue and one worker.
#[derive(Clone)]
pub struct BuildWaiter {
    inner: Arc<Inner>,
}

impl BuildWaiter {
    /// Spawn the worker on the current tokio runtime.
    pub fn start(api: Arc<dyn ActionsApi>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let active: ActiveWatch = Arc::new(Mutex::new(WatchSlot::default()));
        let worker = tokio::spawn(run_worker(
            api,
            Arc::clone(&pending),
            Arc::clone(&active),
            rx,
        ));
        Self {
            inner: Arc::new(Inner {
                pending,
                jobs: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(worker)),
                active,
            }),
        }
    }

    /// Queue a watch for `commit_sha` on `repo`, or join the one in flight.
    ///
    /// An empty sha resolves immediately to `no_sha`. After `shutdown` every
    /// submission resolves to `monitor_error`.
    pub fn submit(&self, repo: RepoSlug, commit_sha: &str, options: WatchOptions) -> BuildFuture {
        let sha = commit_sha.trim();
        if sha.is_empty() {
            return resolved(WorkflowResult::no_sha());
        }

        let key = (repo, sha.to_string());
        let mut pending = lock(&self.inner.pending);
        if let Some(existing) = pending.get(&key) {
            debug!(repo = %key.0, sha = %key.1, "joining pending build watch");
            return existing.future.clone();
        }

        let jobs = lock(&self.inner.jobs);
        let Some(tx) = jobs.as_ref() else {
            return resolved(WorkflowResult::monitor_error("build waiter is shut down"));
        };

        let job = BuildJob {
            repo: key.0.clone(),
            commit_sha: key.1.clone(),
            options,
        };
        if tx.send(job).is_err() {
            return resolved(WorkflowResult::monitor_error("build worker has stopped"));
        }

        let (reply, rx) = oneshot::channel();
        let future = rx
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Arc::new(WorkflowResult::monitor_error(
                        "build waiter shut down before the build concluded",
                    ))
                })
            })
            .boxed()
            .shared();
        debug!(repo = %key.0, sha = %key.1, "queued build watch");
        pending.insert(
            key,
            Pending {
                future: future.clone(),
                reply,
            },
        );
        future
    }

    /// Number of commits queued or being watched.
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    /// Stop the worker and the watch in progress. Every outstanding future
    /// resolves to `monitor_error`.
    pub fn shutdown(&self) {
        lock(&self.inner.jobs).take();
        if let Some(worker) = lock(&self.inner.worker).take() {
            worker.abort();
        }
        {
            let mut active = lock(&self.inner.active);
            active.closed = true;
            if let Some(watch) = active.handle.take() {
                watch.abort();
            }
        }
        let drained: Vec<Pending> = lock(&self.inner.pending)
            .drain()
            .map(|(_, pending)| pending)
            .collect();
        if !drained.is_empty() {
            info!(count = drained.len(), "cancelling pending build watches");
        }
        for pending in drained {
            let _ = pending.reply.send(Arc::new(WorkflowResult::monitor_error(
                "build waiter shut down",
            )));
        }
    }
}

async fn run_worker(
    api: Arc<dyn ActionsApi>,
    pending: PendingMap,
    active: ActiveWatch,
    mut jobs: mpsc::UnboundedReceiver<BuildJob>,
) {
    while let Some(job) = jobs.recv().await {
        let key = (job.repo.clone(), job.commit_sha.clone());
        let api = Arc::clone(&api);

        // A panicking watch must not take the worker down with it.
        let watch = {
            let mut slot = lock(&active);
            if slot.closed {
                break;
            }
            let watch = tokio::spawn(async move { watch_build(api.as_ref(), &job).await });
            slot.handle = Some(watch.abort_handle());
            watch
        };
        let outcome = watch.await;
        lock(&active).handle.take();
        let result = match outcome {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => WorkflowResult::monitor_error("build waiter shut down"),
            Err(e) => {
                error!(repo = %key.0, sha = %key.1, error = %e, "build watch crashed");
                WorkflowResult::monitor_error(format!("build watch crashed: {}", e))
            }
        };

        let entry = lock(&pending).remove(&key);
        if let Some(entry) = entry {
            let _ = entry.reply.send(Arc::new(result));
        }
    }
}
