use std::{collections::HashSet, sync::Arc};

use log::{error, warn};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{timeout_at, Instant},
};

use crate::{
    acceptor::Acceptor,
    behavior::BehaviorProfile,
    config::Config,
    proposer::{Proposer, RoundOutcome},
    registry::Registry,
};

/// Round coordinator: owns the registry, spawns one task per acceptor,
/// provides the readiness barrier, and triggers proposer rounds.
///
/// Concurrent rounds are independent and unsynchronized except through the
/// shared registry and each acceptor's willingness to serve concurrent
/// connections; no cross-round ballot arbitration is performed.
pub struct Cluster {
    config: Arc<Config>,
    registry: Registry,
    behavior: Arc<BehaviorProfile>,
    acceptors: Vec<JoinHandle<()>>,
    ready_tx: Option<mpsc::Sender<u64>>,
    ready_rx: mpsc::Receiver<u64>,
}

impl Cluster {
    /// Cluster over `config.members` members, all initially online, with
    /// the given fault profile. No acceptor runs until
    /// [`start_acceptors`](Cluster::start_acceptors).
    pub fn new(config: Config, behavior: BehaviorProfile) -> Self {
        let registry = Registry::new();
        registry.initialize(config.members);
        let (ready_tx, ready_rx) = mpsc::channel(config.members.max(1) as usize);
        Self {
            config: Arc::new(config),
            registry,
            behavior: Arc::new(behavior),
            acceptors: Vec::new(),
            ready_tx: Some(ready_tx),
            ready_rx,
        }
    }

    /// Spawn one listening task per member. A member whose bind fails never
    /// signals readiness and is reported by
    /// [`wait_ready`](Cluster::wait_ready); the rest are unaffected.
    pub fn start_acceptors(&mut self) {
        let ready_tx = self
            .ready_tx
            .take()
            .expect("acceptors already started");
        for id in 1..=self.config.members {
            let acceptor = Acceptor::new(
                id,
                self.config.clone(),
                self.registry.clone(),
                self.behavior.clone(),
            );
            let ready = ready_tx.clone();
            self.acceptors.push(tokio::spawn(async move {
                if let Err(e) = acceptor.run(ready).await {
                    error!("{}", e);
                }
            }));
        }
    }

    /// Block until every member has signaled readiness or the startup
    /// timeout elapses. Members that never signaled are marked offline and
    /// returned; a partial start is a failure for those members only.
    pub async fn wait_ready(&mut self) -> Vec<u64> {
        let deadline = Instant::now() + self.config.startup_timeout;
        let mut ready = HashSet::new();
        while (ready.len() as u64) < self.config.members {
            match timeout_at(deadline, self.ready_rx.recv()).await {
                Ok(Some(id)) => {
                    ready.insert(id);
                }
                // All senders gone: every remaining acceptor failed to bind.
                Ok(None) => break,
                Err(_) => break,
            }
        }

        let missing: Vec<u64> = (1..=self.config.members)
            .filter(|id| !ready.contains(id))
            .collect();
        for &id in &missing {
            warn!("member M{} never became ready", id);
            self.registry.set_online(id, false);
        }
        missing
    }

    /// Run one proposer round synchronously and return its outcome.
    pub async fn run_proposer(&self, label: &str) -> RoundOutcome {
        Proposer::new(label, self.config.clone(), self.registry.clone())
            .run_round()
            .await
    }

    /// Run one proposer round on its own task, for overlapping rounds.
    pub fn spawn_proposer(&self, label: &str) -> JoinHandle<RoundOutcome> {
        let proposer = Proposer::new(label, self.config.clone(), self.registry.clone());
        tokio::spawn(async move { proposer.run_round().await })
    }

    /// Force a member's liveness flag. Test hook, not a protocol operation.
    pub fn force_online(&self, id: u64, online: bool) {
        self.registry.set_online(id, online);
    }

    /// The shared liveness registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The cluster's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop all acceptor tasks. Listening sockets close when their tasks
    /// are dropped.
    pub fn shutdown(&mut self) {
        for handle in self.acceptors.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        self.shutdown();
    }
}
