use std::sync::Arc;

use futures::future::join_all;
use log::{debug, info, warn};
use rand::Rng;

use crate::{
    config::Config,
    message::{Request, Response},
    registry::Registry,
    transport::{Transport, TransportError},
};

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Yes votes reached the majority.
    Elected,
    /// The accept phase ran but fell short of the majority.
    NoMajority,
    /// Fewer than a majority of promises; the accept phase never ran.
    InsufficientPromises,
}

/// Tally and verdict of one completed round. A round always completes
/// with one of these, never an unhandled fault.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// Ballot id the round ran under.
    pub ballot: u64,
    /// Promises collected in the prepare phase.
    pub promises: usize,
    /// Accept-phase votes in favor.
    pub yes_votes: usize,
    /// Accept-phase votes against, including non-respondents.
    pub no_votes: usize,
    /// The round's verdict.
    pub verdict: Verdict,
}

impl RoundOutcome {
    /// Whether the round elected its candidate.
    pub fn elected(&self) -> bool {
        self.verdict == Verdict::Elected
    }
}

/// Drives one two-phase election round against the council.
pub struct Proposer {
    label: String,
    config: Arc<Config>,
    registry: Registry,
    transport: Transport,
}

impl Proposer {
    /// Proposer identified by `label`; the label only attributes the
    /// candidate value, it carries no protocol weight.
    pub fn new(label: impl Into<String>, config: Arc<Config>, registry: Registry) -> Self {
        let transport = Transport::new(config.call_timeout);
        Self {
            label: label.into(),
            config,
            registry,
            transport,
        }
    }

    /// Run one round: prepare against every believed-online member, gate on
    /// a majority of promises, then accept and tally.
    ///
    /// Every per-member failure is absorbed into the counts; the loop over
    /// the remaining members is never aborted.
    pub async fn run_round(&self) -> RoundOutcome {
        let ballot: u64 = rand::thread_rng().gen();
        let value = format!("Council President Election by {}", self.label);
        let majority = self.config.majority();

        let promises = self.prepare_phase(ballot).await;
        if promises < majority {
            info!(
                "proposal by {} got {} promises, majority is {}: rejected",
                self.label, promises, majority
            );
            return RoundOutcome {
                ballot,
                promises,
                yes_votes: 0,
                no_votes: 0,
                verdict: Verdict::InsufficientPromises,
            };
        }
        info!("proposal by {} has majority promises", self.label);

        let (yes_votes, no_votes) = self.accept_phase(ballot, &value).await;
        let verdict = if yes_votes >= majority {
            Verdict::Elected
        } else {
            Verdict::NoMajority
        };
        info!(
            "proposal by {}: {} YES, {} NO: {:?}",
            self.label, yes_votes, no_votes, verdict
        );
        RoundOutcome {
            ballot,
            promises,
            yes_votes,
            no_votes,
            verdict,
        }
    }

    /// Phase 1: count well-formed promises for `ballot`. Transport failures
    /// and any reply other than a matching promise are silently excluded,
    /// not counted as refusals.
    async fn prepare_phase(&self, ballot: u64) -> usize {
        let request = Request::Prepare { ballot }.to_string();
        let replies = self.broadcast(&request).await;

        let mut promises = 0;
        for (id, reply) in replies {
            match reply {
                Ok(line) => match line.parse::<Response>() {
                    Ok(Response::Promise { ballot: b }) if b == ballot => promises += 1,
                    Ok(other) => debug!("member M{} answered prepare with {:?}", id, other),
                    Err(e) => warn!("member M{}: {}", id, e),
                },
                Err(e) => warn!("failed to communicate with member M{}: {}", id, e),
            }
        }
        promises
    }

    /// Phase 2: tally votes for `value`. Only `YES` counts in favor; any
    /// other reply, a dropped reply, or an unreachable member counts
    /// against. (The prepare phase excludes non-respondents instead;
    /// the asymmetry is inherited behavior.)
    async fn accept_phase(&self, ballot: u64, value: &str) -> (usize, usize) {
        let request = Request::Accept {
            ballot,
            value: value.to_string(),
        }
        .to_string();
        let replies = self.broadcast(&request).await;

        let mut yes_votes = 0;
        let mut no_votes = 0;
        for (id, reply) in replies {
            match reply {
                Ok(line) if line.parse::<Response>().ok() == Some(Response::Yes) => yes_votes += 1,
                Ok(line) => {
                    debug!("member M{} voted no with {:?}", id, line);
                    no_votes += 1;
                }
                Err(e) => {
                    warn!("failed to communicate with member M{}: {}", id, e);
                    no_votes += 1;
                }
            }
        }
        (yes_votes, no_votes)
    }

    /// Send one request line to every member believed online at call time.
    /// The snapshot is taken once; a member that goes offline mid-phase is
    /// still contacted and surfaces as a transport error, not a skip.
    async fn broadcast(&self, request: &str) -> Vec<(u64, Result<String, TransportError>)> {
        let targets = self.registry.online_members();
        join_all(targets.into_iter().map(|id| {
            let addr = self.config.member_addr(id);
            let transport = self.transport.clone();
            let request = request.to_string();
            async move { (id, transport.call(&addr, &request).await) }
        }))
        .await
    }
}
