//! Single worker thread running policy cycles
//!
//! Cycles block while the zen change is confirmed, so they run on their own
//! thread and never stall the async consumer loop. One thread means at most
//! one cycle at a time, in submission order. Each submission carries a
//! completion signal so the submitter can hold back the next position until
//! the current cycle is done.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;
use tracing::{info, warn};

use super::machine::{report_failure, ApplyMode, PolicyExecutor};
use crate::policy::Position;

struct Job {
    position: Position,
    done: oneshot::Sender<()>,
}

/// Handle for submitting positions to the worker
#[derive(Clone)]
pub struct PolicySubmitter {
    tx: mpsc::Sender<Job>,
}

impl PolicySubmitter {
    /// Hand a live cycle to the worker
    ///
    /// The returned receiver resolves once the cycle has finished, whether
    /// it succeeded or not. `None` once the worker has exited.
    pub fn submit(&self, position: Position) -> Option<oneshot::Receiver<()>> {
        let (done, finished) = oneshot::channel();
        self.tx.send(Job { position, done }).ok()?;
        Some(finished)
    }
}

pub struct PolicyWorker {
    submitter: PolicySubmitter,
    handle: JoinHandle<PolicyExecutor>,
}

impl PolicyWorker {
    pub fn spawn(mut executor: PolicyExecutor) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();

        let handle = thread::Builder::new()
            .name("policy-worker".to_string())
            .spawn(move || {
                info!("policy worker started");
                while let Ok(Job { position, done }) = rx.recv() {
                    if let Err(e) = executor.execute(position, ApplyMode::Live) {
                        report_failure(position, &e);
                    }
                    // Submitter may have stopped waiting
                    let _ = done.send(());
                }
                info!("policy worker stopped");
                executor
            })?;

        Ok(Self {
            submitter: PolicySubmitter { tx },
            handle,
        })
    }

    pub fn submitter(&self) -> PolicySubmitter {
        self.submitter.clone()
    }

    /// Finish submitted cycles and hand the executor back
    ///
    /// Every `PolicySubmitter` clone must be dropped first or this waits
    /// for them.
    pub fn shutdown(self) -> Option<PolicyExecutor> {
        drop(self.submitter);
        match self.handle.join() {
            Ok(executor) => Some(executor),
            Err(_) => {
                warn!("policy worker panicked");
                None
            }
        }
    }
}
