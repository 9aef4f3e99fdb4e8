use std::{io, time::Duration};

use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::timeout,
};

/// Why a single request/response exchange failed.
///
/// Every variant is recoverable: the caller treats the peer as a
/// non-respondent for the current phase and moves on.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connect refused, reset, or the peer closed before replying.
    #[error("peer unreachable: {0}")]
    Unreachable(#[from] io::Error),
    /// Connect or read exceeded the configured bound.
    #[error("call timed out")]
    Timeout,
    /// The peer replied with bytes that are not one well-formed line.
    #[error("malformed response")]
    MalformedResponse,
}

/// One-shot line transport: open a connection, write one newline-terminated
/// request, read one newline-terminated response, close. No connection
/// reuse, no pipelining. Connect and read are each bounded by `timeout` so
/// a single slow peer cannot stall an entire round.
#[derive(Debug, Clone)]
pub struct Transport {
    timeout: Duration,
}

impl Transport {
    /// Transport with the given per-operation bound.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Perform one exchange against `addr`, returning the response line
    /// with its terminator stripped.
    pub async fn call(&self, addr: &str, request: &str) -> Result<String, TransportError> {
        let stream = timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| TransportError::Timeout)??;
        let (read_half, mut write_half) = stream.into_split();

        write_half
            .write_all(format!("{}\n", request).as_bytes())
            .await?;

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        let n = timeout(self.timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| TransportError::Timeout)??;
        if n == 0 {
            // Peer closed without replying; a simulated drop lands here.
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a reply",
            )
            .into());
        }
        if !line.ends_with('\n') {
            return Err(TransportError::MalformedResponse);
        }
        Ok(line.trim_end().to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn unreachable_peer_is_an_error_value() {
        let t = Transport::new(Duration::from_millis(500));
        let err = t.call("127.0.0.1:1", "PREPARE:1").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Unreachable(_) | TransportError::Timeout
        ));
    }

    #[tokio::test]
    async fn closed_without_reply_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let t = Transport::new(Duration::from_secs(2));
        let err = t.call(&addr, "PREPARE:1").await.unwrap_err();
        assert!(matches!(err, TransportError::Unreachable(_)));
    }

    #[tokio::test]
    async fn round_trips_one_line() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (r, mut w) = stream.into_split();
            let mut line = String::new();
            BufReader::new(r).read_line(&mut line).await.unwrap();
            assert_eq!(line, "PREPARE:5\n");
            w.write_all(b"PROMISE:5:Accepted\n").await.unwrap();
        });

        let t = Transport::new(Duration::from_secs(2));
        let resp = t.call(&addr, "PREPARE:5").await.unwrap();
        assert_eq!(resp, "PROMISE:5:Accepted");
    }
}
