//! TCP 리스너
//!
//! 개행으로 구분된 줄을 TCP 소켓으로 수신합니다.
//! 각 연결은 별도의 tokio 태스크에서 처리되며, 동시 연결 수는 세마포어로 제한합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logship_core::config::TcpInputConfig;
use logship_core::error::LogshipError;
use logship_core::pipeline::{EventHandler, HealthStatus, Listener, Pipeline};

use super::{EventFanout, IngestTags, ListenerRuntime, ListenerState, line_to_event};
use crate::error::LogPipelineError;

/// TCP 리스너
pub struct TcpListenerInput {
    config: TcpInputConfig,
    tags: IngestTags,
    runtime: ListenerRuntime,
    local_addr: Option<SocketAddr>,
}

impl TcpListenerInput {
    /// 새 TCP 리스너를 생성합니다.
    pub fn new(config: TcpInputConfig, hostname: &str, cancel: CancellationToken) -> Self {
        let tags = IngestTags::new(config.event_type.clone(), hostname);
        let runtime = ListenerRuntime::new(config.name.clone(), cancel);
        Self {
            config,
            tags,
            runtime,
            local_addr: None,
        }
    }

    /// 실제로 바인드된 주소 (시작 후에만)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 현재 상태
    pub fn state(&self) -> ListenerState {
        self.runtime.state()
    }

    async fn accept_loop(
        listener: TcpListener,
        config: TcpInputConfig,
        tags: Arc<IngestTags>,
        fanout: Arc<EventFanout>,
        cancel: CancellationToken,
    ) {
        let permits = Arc::new(Semaphore::new(config.max_connections));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(listener = %config.name, "accept loop received shutdown signal");
                    break;
                }
                result = listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(listener = %config.name, error = %e, "accept failed");
                            continue;
                        }
                    };

                    let Ok(permit) = permits.clone().try_acquire_owned() else {
                        warn!(
                            listener = %config.name,
                            peer = %peer,
                            max = config.max_connections,
                            "max connections reached, rejecting connection"
                        );
                        continue;
                    };

                    debug!(listener = %config.name, peer = %peer, "accepted connection");
                    let name = config.name.clone();
                    let idle = Duration::from_secs(config.idle_timeout_secs);
                    let max_line = config.max_line_length;
                    let tags = Arc::clone(&tags);
                    let fanout = Arc::clone(&fanout);
                    let cancel = cancel.clone();

                    tokio::spawn(async move {
                        let conn = Connection { name, peer, idle, max_line };
                        if let Err(e) = conn.serve(stream, &tags, &fanout, cancel).await {
                            debug!(peer = %peer, error = %e, "connection closed with error");
                        }
                        drop(permit);
                    });
                }
            }
        }
    }
}

/// 단일 TCP 연결
struct Connection {
    name: String,
    peer: SocketAddr,
    idle: Duration,
    max_line: usize,
}

impl Connection {
    async fn serve(
        &self,
        stream: TcpStream,
        tags: &IngestTags,
        fanout: &EventFanout,
        cancel: CancellationToken,
    ) -> Result<(), LogPipelineError> {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        // 한 줄에서 최대 길이 + 개행까지만 읽습니다.
        let limit = self.max_line as u64 + 2;

        loop {
            line.clear();
            let mut limited = (&mut reader).take(limit);

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(listener = %self.name, peer = %self.peer, "connection received shutdown signal");
                    return Ok(());
                }
                result = timeout(self.idle, limited.read_line(&mut line)) => {
                    match result {
                        Ok(Ok(0)) => {
                            debug!(listener = %self.name, peer = %self.peer, "connection closed by peer");
                            return Ok(());
                        }
                        Ok(Ok(_)) => {
                            if line.trim_end_matches(['\r', '\n']).len() > self.max_line {
                                warn!(
                                    listener = %self.name,
                                    peer = %self.peer,
                                    max = self.max_line,
                                    "line exceeds max length, closing connection"
                                );
                                return Ok(());
                            }
                            if let Some(event) = line_to_event(&line, tags) {
                                fanout.emit(event);
                            }
                        }
                        Ok(Err(e)) => return Err(e.into()),
                        Err(_) => {
                            debug!(listener = %self.name, peer = %self.peer, "idle timeout");
                            return Err(LogPipelineError::Collector {
                                source_type: "tcp".to_owned(),
                                reason: format!("idle timeout from {}", self.peer),
                            });
                        }
                    }
                }
            }
        }
    }
}

impl Pipeline for TcpListenerInput {
    async fn start(&mut self) -> Result<(), LogshipError> {
        let fanout = self.runtime.begin()?;

        let listener = TcpListener::bind(&self.config.bind)
            .await
            .map_err(|e| LogPipelineError::Collector {
                source_type: "tcp".to_owned(),
                reason: format!("failed to bind to {}: {}", self.config.bind, e),
            })?;
        let local_addr = listener.local_addr().map_err(LogPipelineError::from)?;
        self.local_addr = Some(local_addr);
        info!(
            listener = %self.config.name,
            addr = %local_addr,
            subscribers = self.runtime.subscribers(),
            "tcp listener bound"
        );

        let task = Self::accept_loop(
            listener,
            self.config.clone(),
            Arc::new(self.tags.clone()),
            fanout,
            self.runtime.cancel_token(),
        );
        self.runtime.spawn(task);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogshipError> {
        self.runtime.stop().await
    }

    async fn health_check(&self) -> HealthStatus {
        self.runtime.health()
    }
}

impl Listener for TcpListenerInput {
    fn name(&self) -> &str {
        self.runtime.name()
    }

    fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.runtime.subscribe(handler);
    }
}
