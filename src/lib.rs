#![deny(missing_docs)]
#![deny(clippy::all)]
//! A single-decree council election simulator.
//!
//! A fixed fleet of members each runs an acceptor service on its own TCP
//! port; proposers drive two-phase prepare/accept rounds against the fleet
//! and tally votes toward a majority, while a behavior simulator injects
//! delays, dropped replies, and members going offline mid-round.
//!
//! Acceptors here promise and vote unconditionally: this is a quorum
//! election exercise, not safe multi-round Paxos. Majority counting is
//! correct, failures are isolated per call, and concurrent rounds cannot
//! corrupt the shared liveness state; nothing more is guaranteed.

mod acceptor;
mod behavior;
mod cluster;
mod config;
mod message;
mod proposer;
mod registry;
mod transport;


pub use acceptor::{Acceptor, AcceptorError};
pub use behavior::{BehaviorProfile, Outcome};
pub use cluster::Cluster;
pub use config::Config;
pub use message::{ProtocolError, Request, Response};
pub use proposer::{Proposer, RoundOutcome, Verdict};
pub use registry::Registry;
pub use transport::{Transport, TransportError};
