use std::sync::Arc;

use log::{debug, info, warn};
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::sleep,
};

use crate::{
    behavior::{BehaviorProfile, Outcome},
    config::Config,
    message::{Request, Response},
    registry::Registry,
};

/// Startup failure of one member's listening service. Fatal for that
/// member only, never for the rest of the council.
#[derive(Debug, Error)]
pub enum AcceptorError {
    /// The member's dedicated port could not be acquired.
    #[error("member {id} failed to bind {addr}: {source}")]
    Bind {
        /// Member whose startup failed.
        id: u64,
        /// Address the bind was attempted on.
        addr: String,
        /// Underlying bind error.
        source: std::io::Error,
    },
}

/// Per-member listening service.
///
/// Binds the member's dedicated port, then serves one request per
/// connection forever. The accept loop survives every per-connection
/// error; only the initial bind can fail.
#[derive(Clone)]
pub struct Acceptor {
    id: u64,
    config: Arc<Config>,
    registry: Registry,
    behavior: Arc<BehaviorProfile>,
}

impl Acceptor {
    /// Acceptor for member `id`.
    pub fn new(
        id: u64,
        config: Arc<Config>,
        registry: Registry,
        behavior: Arc<BehaviorProfile>,
    ) -> Self {
        Self {
            id,
            config,
            registry,
            behavior,
        }
    }

    /// Bind, signal readiness on `ready`, then accept connections until the
    /// task is dropped. Each connection is served on its own task, so a
    /// delayed request does not block the next one.
    pub async fn run(self, ready: mpsc::Sender<u64>) -> Result<(), AcceptorError> {
        let addr = self.config.member_addr(self.id);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AcceptorError::Bind {
                id: self.id,
                addr: addr.clone(),
                source,
            })?;

        self.registry.set_online(self.id, true);
        // The coordinator may have stopped waiting already; that is fine.
        let _ = ready.send(self.id).await;
        drop(ready);
        info!("member M{} is ready on {}", self.id, addr);

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let acceptor = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = acceptor.handle(stream).await {
                            warn!("member M{}: {}", acceptor.id, e);
                        }
                    });
                }
                Err(e) => warn!("member M{} accept failed: {}", self.id, e),
            }
        }
    }

    /// Serve one connection: read one request line, consult the behavior
    /// simulator exactly once before any reply, then answer or stay silent.
    async fn handle(&self, stream: TcpStream) -> anyhow::Result<()> {
        let (read_half, mut write_half) = stream.into_split();
        let mut line = String::new();
        BufReader::new(read_half).read_line(&mut line).await?;

        let outcome = {
            let mut rng = rand::thread_rng();
            self.behavior.decide(self.id, &mut rng)
        };
        match outcome {
            Outcome::Drop => {
                debug!("member M{} dropped a request", self.id);
                return Ok(());
            }
            Outcome::GoOffline => {
                self.registry.set_online(self.id, false);
                info!("member M{} went offline", self.id);
                write_half
                    .write_all(format!("{}\n", Response::Offline).as_bytes())
                    .await?;
                return Ok(());
            }
            Outcome::RespondAfterDelay(d) => {
                debug!("member M{} delaying reply by {:?}", self.id, d);
                sleep(d).await;
            }
            Outcome::Respond => {}
        }

        if !self.registry.is_online(self.id) {
            debug!("member M{} is offline and cannot process requests", self.id);
            write_half
                .write_all(format!("{}\n", Response::Offline).as_bytes())
                .await?;
            return Ok(());
        }

        // A malformed line closes the connection without a reply.
        let request: Request = line.trim_end().parse()?;
        let response = match request {
            Request::Prepare { ballot } => Response::Promise { ballot },
            Request::Accept { .. } => Response::Yes,
        };
        write_half
            .write_all(format!("{}\n", response).as_bytes())
            .await?;
        Ok(())
    }
}
