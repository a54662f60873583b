//! Dispatcher — routes messages to one worker task per conversation.
//!
//! Each conversation key (`channel:user_id`) gets its own worker that owns
//! the [`Conversation`] and handles that user's messages strictly in
//! arrival order. Different users never wait on each other, and no lock is
//! held while a worker talks to the registration backend.
//!
//! A worker that has been idle for the configured timeout removes itself
//! from the map and drops its conversation, discarding any half-finished
//! session. The next message from that user starts a fresh worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channels::{ChannelManager, IncomingMessage};
use crate::dialogue::{Conversation, Flow, InputParser};
use crate::registration::Registrar;

/// How long [`Dispatcher::shutdown`] waits for in-flight conversations.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

struct WorkerHandle {
    id: u64,
    tx: mpsc::UnboundedSender<IncomingMessage>,
    task: JoinHandle<()>,
}

type WorkerMap = Arc<Mutex<HashMap<String, WorkerHandle>>>;

fn lock(map: &WorkerMap) -> MutexGuard<'_, HashMap<String, WorkerHandle>> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}

/// Everything a worker needs besides its own inbox.
#[derive(Clone)]
struct WorkerDeps {
    flow: Arc<dyn Flow>,
    registrar: Arc<dyn Registrar>,
    channels: Arc<ChannelManager>,
    idle_timeout: Duration,
}

pub struct Dispatcher {
    deps: WorkerDeps,
    workers: WorkerMap,
    next_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        flow: Arc<dyn Flow>,
        registrar: Arc<dyn Registrar>,
        channels: Arc<ChannelManager>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            deps: WorkerDeps {
                flow,
                registrar,
                channels,
                idle_timeout,
            },
            workers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Hand `message` to its conversation's worker, spawning one if needed.
    pub fn dispatch(&self, message: IncomingMessage) {
        let key = message.conversation_key();
        let mut workers = lock(&self.workers);

        let message = match workers.get(&key) {
            Some(handle) => match handle.tx.send(message) {
                Ok(()) => return,
                // Worker is gone (it panicked); replace it below.
                Err(mpsc::error::SendError(message)) => {
                    tracing::warn!(conversation = %key, "Conversation worker vanished, respawning");
                    message
                }
            },
            None => message,
        };

        let handle = self.spawn_worker(key.clone());
        if handle.tx.send(message).is_err() {
            tracing::error!(conversation = %key, "Fresh conversation worker refused a message");
        }
        workers.insert(key, handle);
    }

    /// Number of conversations with a live worker.
    pub fn active_conversations(&self) -> usize {
        lock(&self.workers).len()
    }

    /// Close every inbox and wait (bounded) for workers to finish what they
    /// already received.
    pub async fn shutdown(&self) {
        let handles: Vec<WorkerHandle> = lock(&self.workers).drain().map(|(_, h)| h).collect();
        if handles.is_empty() {
            return;
        }
        tracing::info!(count = handles.len(), "Waiting for active conversations");

        let tasks: Vec<JoinHandle<()>> = handles.into_iter().map(|h| h.task).collect();
        let joined = futures::future::join_all(tasks);
        if tokio::time::timeout(SHUTDOWN_GRACE, joined).await.is_err() {
            tracing::warn!("Conversations still running after shutdown grace period");
        }
    }

    fn spawn_worker(&self, key: String) -> WorkerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_worker(
            id,
            key.clone(),
            rx,
            self.deps.clone(),
            Arc::clone(&self.workers),
        ));
        tracing::debug!(conversation = %key, worker = id, "Conversation worker started");
        WorkerHandle { id, tx, task }
    }
}

async fn run_worker(
    id: u64,
    key: String,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
    deps: WorkerDeps,
    workers: WorkerMap,
) {
    let mut conversation = Conversation::new(deps.flow, deps.registrar);

    loop {
        let message = match tokio::time::timeout(deps.idle_timeout, rx.recv()).await {
            Ok(Some(message)) => message,
            // Inbox closed by shutdown.
            Ok(None) => break,
            Err(_) => {
                let mut map = lock(&workers);
                // A message may have arrived between the timeout and the lock.
                if !rx.is_empty() {
                    continue;
                }
                if map.get(&key).is_some_and(|h| h.id == id) {
                    map.remove(&key);
                }
                if let Some(session) = conversation.session() {
                    let now = chrono::Utc::now();
                    tracing::info!(
                        conversation = %key,
                        attempt_id = %session.attempt_id,
                        step = %session.step,
                        idle_secs = session.idle_for(now).num_seconds(),
                        age_secs = session.age(now).num_seconds(),
                        "Registration abandoned after inactivity"
                    );
                }
                break;
            }
        };

        let input = InputParser::parse(&message);
        let reply = conversation.handle(&message.user_id, input).await;
        if let Err(e) = deps.channels.respond(&message, reply).await {
            tracing::warn!(conversation = %key, "Failed to send reply: {e}");
        }
    }

    tracing::debug!(conversation = %key, worker = id, "Conversation worker stopped");
}
