//! Minimal ICAP-style TCP gateway
//!
//! Each connection carries exactly one request line:
//!
//! ```text
//! REQMOD icap://proxy/moderate PROMPT=<text>\r\n
//! ```
//!
//! The method and URI are ignored. The prompt is everything after the first
//! `PROMPT=`, or the whole line when the marker is absent. The gateway
//! answers once and closes the connection:
//!
//! - allow: `ICAP/1.0 204 No Content`
//! - block or redact: `ICAP/1.0 200 OK` with an `ISTag` header, followed by
//!   the decision's output text
//! - any failure: `500 Internal Server Error`

use anyhow::{Context, Result};
use futures::StreamExt;
use promptgate_core::{Action, Error};
use promptgate_telemetry::{metrics, Adapter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::IcapConfig;
use crate::state::AppState;

/// User id recorded in history for ICAP requests
pub const ICAP_USER_ID: &str = "icap-client";

pub const NO_CONTENT_RESPONSE: &str = "ICAP/1.0 204 No Content\r\n\r\n";
pub const MODIFIED_RESPONSE_HEAD: &str = "ICAP/1.0 200 OK\r\nISTag: \"Mitigation-1.0\"\r\n\r\n";
pub const ERROR_RESPONSE: &str = "500 Internal Server Error\r\n";

const PROMPT_MARKER: &str = "PROMPT=";

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Prompt carried by a request line
pub fn extract_prompt(line: &str) -> &str {
    match line.split_once(PROMPT_MARKER) {
        Some((_, prompt)) => prompt,
        None => line,
    }
}

/// A bound ICAP listener, ready to serve
pub struct IcapGateway {
    listener: TcpListener,
    state: AppState,
    config: IcapConfig,
}

impl IcapGateway {
    pub async fn bind(config: IcapConfig, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen)
            .await
            .with_context(|| format!("Failed to bind ICAP listener on {}", config.listen))?;

        Ok(Self {
            listener,
            state,
            config,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "ICAP gateway listening");

        let limiter = Arc::new(Semaphore::new(self.config.max_connections.max(1)));
        let max_line_bytes = self.config.max_line_bytes;
        let read_timeout = self.config.read_timeout();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let Ok(permit) = limiter.clone().try_acquire_owned() else {
                                warn!(
                                    %peer,
                                    limit = self.config.max_connections,
                                    "ICAP connection limit reached, dropping connection"
                                );
                                drop(stream);
                                continue;
                            };

                            let state = self.state.clone();
                            tokio::spawn(async move {
                                handle_connection(stream, state, max_line_bytes, read_timeout).await;
                                drop(permit);
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "ICAP accept error");
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("ICAP gateway shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: AppState,
    max_line_bytes: usize,
    read_timeout: Duration,
) {
    let peer = stream.peer_addr().ok();
    let (reader, mut writer) = stream.into_split();
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_bytes));

    let line = match read_request_line(&mut lines, read_timeout).await {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!(?peer, "ICAP connection closed before sending a request");
            return;
        }
        Err(e) => {
            warn!(?peer, error = %e, "Malformed ICAP request");
            metrics::record_error(Adapter::Icap, e.kind());
            let _ = writer.write_all(ERROR_RESPONSE.as_bytes()).await;
            let _ = writer.shutdown().await;
            return;
        }
    };

    let prompt = extract_prompt(&line);
    let decision = state.moderate(Adapter::Icap, ICAP_USER_ID, prompt).await;
    debug!(?peer, action = %decision.action, "ICAP request moderated");

    let result = match decision.action {
        Action::Allow => writer.write_all(NO_CONTENT_RESPONSE.as_bytes()).await,
        Action::Block | Action::Redact => {
            let mut response =
                Vec::with_capacity(MODIFIED_RESPONSE_HEAD.len() + decision.prompt_out.len());
            response.extend_from_slice(MODIFIED_RESPONSE_HEAD.as_bytes());
            response.extend_from_slice(decision.prompt_out.as_bytes());
            writer.write_all(&response).await
        }
    };

    if let Err(e) = result {
        warn!(?peer, error = %e, "Failed to write ICAP response");
        metrics::record_error(Adapter::Icap, "io");
        return;
    }
    let _ = writer.shutdown().await;
}

/// Read the single request line; `None` if the peer sent nothing at all
async fn read_request_line<R>(
    lines: &mut FramedRead<R, LinesCodec>,
    read_timeout: Duration,
) -> promptgate_core::Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let next = tokio::time::timeout(read_timeout, lines.next())
        .await
        .map_err(|_| Error::Timeout)?;

    match next {
        None => Ok(None),
        Some(Ok(line)) => Ok(Some(line)),
        Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
            Err(Error::protocol("request line too long"))
        }
        Some(Err(LinesCodecError::Io(e))) if e.kind() == std::io::ErrorKind::InvalidData => {
            Err(Error::protocol("request line is not valid UTF-8"))
        }
        Some(Err(LinesCodecError::Io(e))) => Err(Error::Io(e)),
    }
}
