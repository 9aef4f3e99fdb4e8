//! Line-oriented wire protocol, one colon-delimited exchange per connection.
//!
//! ```text
//! proposer -> acceptor   PREPARE:<ballot>
//! acceptor -> proposer   PROMISE:<ballot>:Accepted
//! proposer -> acceptor   ACCEPT:<ballot>:<value>
//! acceptor -> proposer   YES
//! acceptor -> proposer   offline
//! ```

use std::{fmt, str::FromStr};

use thiserror::Error;

/// A line the protocol cannot make sense of. The offending exchange is
/// discarded by the receiver, never retried.
#[derive(Debug, Error)]
#[error("malformed protocol line: {0:?}")]
pub struct ProtocolError(
    /// The offending line.
    pub String,
);

/// Request sent by a proposer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Phase-1 request for a promise on `ballot`.
    Prepare {
        /// Round-scoped ballot identifier.
        ballot: u64,
    },
    /// Phase-2 request to accept `value` under `ballot`.
    Accept {
        /// Round-scoped ballot identifier.
        ballot: u64,
        /// The candidate value being elected.
        value: String,
    },
}

/// Reply sent by an acceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Phase-1 promise to consider `ballot`.
    Promise {
        /// The ballot being promised, echoed from the request.
        ballot: u64,
    },
    /// Phase-2 vote in favor.
    Yes,
    /// Member declines, simulated unavailability.
    Offline,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Prepare { ballot } => write!(f, "PREPARE:{}", ballot),
            Request::Accept { ballot, value } => write!(f, "ACCEPT:{}:{}", ballot, value),
        }
    }
}

impl FromStr for Request {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ProtocolError(line.to_string());
        let mut parts = line.splitn(3, ':');
        let command = parts.next().ok_or_else(malformed)?;
        let ballot = parts
            .next()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(malformed)?;
        match (command, parts.next()) {
            ("PREPARE", None) => Ok(Request::Prepare { ballot }),
            ("ACCEPT", Some(value)) => Ok(Request::Accept {
                ballot,
                value: value.to_string(),
            }),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Promise { ballot } => write!(f, "PROMISE:{}:Accepted", ballot),
            Response::Yes => write!(f, "YES"),
            Response::Offline => write!(f, "offline"),
        }
    }
}

impl FromStr for Response {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line {
            "YES" => return Ok(Response::Yes),
            "offline" => return Ok(Response::Offline),
            _ => {}
        }
        let mut parts = line.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("PROMISE"), Some(ballot), Some("Accepted")) => {
                let ballot = ballot
                    .parse::<u64>()
                    .map_err(|_| ProtocolError(line.to_string()))?;
                Ok(Response::Promise { ballot })
            }
            _ => Err(ProtocolError(line.to_string())),
        }
    }
}
