//! UDP 리스너
//!
//! 데이터그램 하나를 이벤트 하나로 취급합니다.
//! 데이터그램 안의 개행은 메시지 일부로 남습니다.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logship_core::config::UdpInputConfig;
use logship_core::error::LogshipError;
use logship_core::pipeline::{EventHandler, HealthStatus, Listener, Pipeline};

use super::{EventFanout, IngestTags, ListenerRuntime, ListenerState, line_to_event};
use crate::error::LogPipelineError;

/// 수신 버퍼 크기 (UDP 최대 페이로드)
const MAX_DATAGRAM: usize = 65535;

/// UDP 리스너
pub struct UdpListenerInput {
    config: UdpInputConfig,
    tags: IngestTags,
    runtime: ListenerRuntime,
    local_addr: Option<SocketAddr>,
}

impl UdpListenerInput {
    /// 새 UDP 리스너를 생성합니다.
    pub fn new(config: UdpInputConfig, hostname: &str, cancel: CancellationToken) -> Self {
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

    async fn recv_loop(
        socket: UdpSocket,
        name: String,
        tags: IngestTags,
        fanout: Arc<EventFanout>,
        cancel: CancellationToken,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(listener = %name, "udp listener received shutdown signal");
                    break;
                }
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, peer)) => {
                            let text = String::from_utf8_lossy(&buf[..len]);
                            match line_to_event(&text, &tags) {
                                Some(event) => fanout.emit(event),
                                None => debug!(listener = %name, peer = %peer, "empty datagram"),
                            }
                        }
                        Err(e) => warn!(listener = %name, error = %e, "udp receive failed"),
                    }
                }
            }
        }
    }
}

impl Pipeline for UdpListenerInput {
    async fn start(&mut self) -> Result<(), LogshipError> {
        let fanout = self.runtime.begin()?;

        let socket = UdpSocket::bind(&self.config.bind)
            .await
            .map_err(|e| LogPipelineError::Collector {
                source_type: "udp".to_owned(),
                reason: format!("failed to bind to {}: {}", self.config.bind, e),
            })?;
        let local_addr = socket.local_addr().map_err(LogPipelineError::from)?;
        self.local_addr = Some(local_addr);
        info!(
            listener = %self.config.name,
            addr = %local_addr,
            subscribers = self.runtime.subscribers(),
            "udp listener bound"
        );

        let task = Self::recv_loop(
            socket,
            self.config.name.clone(),
            self.tags.clone(),
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

impl Listener for UdpListenerInput {
    fn name(&self) -> &str {
        self.runtime.name()
    }

    fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.runtime.subscribe(handler);
    }
}
