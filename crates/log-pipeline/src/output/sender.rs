//! 출력 전송기 -- 수신 핸들러, 대기 큐, 송신 루프
//!
//! [`OutputSender`]는 core의 [`Pipeline`]과 [`Output`] trait을 구현하여 매니저가
//! 리스너와 같은 생명주기로 관리합니다.
//!
//! # 내부 아키텍처
//! ```text
//! Listener -> SenderCore::on_event -> FilterChain -> PendingQueue
//!                                                        |
//!                      (interval tick) DeliveryWorker::flush_cycle -> Transport
//! ```
//!
//! 수신 핸들러는 호출자 태스크에서 동기적으로 실행되며 큐 락을 잠깐 잡는 것 외에는
//! 블로킹하지 않습니다. 네트워크 I/O는 송신 루프에서만 일어납니다.
//!
//! 모든 호스트가 실패한 배치는 다시 큐에 넣지 않고 버립니다 (best-effort 전달).

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logship_core::config::OutputConfig;
use logship_core::error::{LogshipError, PipelineError};
use logship_core::event::Event;
use logship_core::pipeline::{EventHandler, HealthStatus, Output, OutputStats, Pipeline, Transport};

use super::queue::PendingQueue;
use super::rotation::HostRotation;
use crate::error::LogPipelineError;
use crate::filter::{ChainResult, FilterChain};

/// 시작 메타데이터 문서의 `type` 값
pub const STARTUP_EVENT_TYPE: &str = "logship_startup";

/// 호스트가 필요 없는 전송 방식(stdout)에 사용하는 호스트 이름
pub const LOCAL_HOST: &str = "local";

/// 출력 전송기 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// 생성됨, 아직 시작하지 않음
    Idle,
    /// 송신 루프 실행 중
    Running,
    /// 정지 요청 후 송신 루프 종료 대기 중
    Draining,
    /// 정지됨
    Stopped,
}

impl fmt::Display for SenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// 전송기가 자신을 알리는 시작 메타데이터
#[derive(Debug, Clone, Serialize)]
pub struct StartupMetadata {
    /// 항상 [`STARTUP_EVENT_TYPE`]
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// 에이전트 호스트 이름
    pub host: String,
    /// 전송기 이름
    pub sender: String,
    /// 시작 시각
    pub started_at: DateTime<Utc>,
    /// 에이전트 버전
    pub version: &'static str,
}

impl StartupMetadata {
    /// 현재 시각으로 메타데이터를 만듭니다.
    pub fn new(host: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            event_type: STARTUP_EVENT_TYPE,
            host: host.into(),
            sender: sender.into(),
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// 플러시 사이클 하나의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// 큐가 비어 있었음
    Empty,
    /// 배치 전체를 `host`로 전달함
    Delivered {
        /// 성공한 호스트
        host: String,
        /// 전달한 메시지 수
        count: usize,
    },
    /// 모든 호스트가 실패해 배치를 버림
    Exhausted {
        /// 버린 메시지 수
        count: usize,
    },
    /// 재시도 중 취소 신호를 관찰해 배치를 버림
    Cancelled {
        /// 버린 메시지 수
        count: usize,
    },
}

/// 전송기 내부 카운터
#[derive(Debug, Default)]
struct SenderStats {
    received: AtomicU64,
    filtered: AtomicU64,
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed_cycles: AtomicU64,
    lost: AtomicU64,
    overflow_dropped: AtomicU64,
    panics: AtomicU64,
    degraded: AtomicBool,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
}

/// 수신 핸들러와 송신 루프가 공유하는 상태
///
/// 리스너에는 `Arc<SenderCore>`가 [`EventHandler`]로 등록됩니다.
pub struct SenderCore {
    name: String,
    chain: Arc<FilterChain>,
    queue: PendingQueue,
    stats: SenderStats,
}

impl SenderCore {
    fn new(name: String, chain: Arc<FilterChain>, queue: PendingQueue) -> Self {
        Self {
            name,
            chain,
            queue,
            stats: SenderStats::default(),
        }
    }

    /// 전송기 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 대기 큐
    pub fn queue(&self) -> &PendingQueue {
        &self.queue
    }

    /// 이벤트 하나를 필터링하고 직렬화해 큐에 적재합니다.
    ///
    /// 필터 실행 중 panic은 이 이벤트에 한정되며 다른 이벤트 처리에 영향을 주지 않습니다.
    pub fn receive(&self, mut event: Event) {
        bump(&self.stats.received, 1);

        let result = catch_unwind(AssertUnwindSafe(|| self.chain.run(&mut event)));
        match result {
            Ok(ChainResult::Keep) => {}
            Ok(ChainResult::Drop) => {
                bump(&self.stats.filtered, 1);
                return;
            }
            Err(_) => {
                bump(&self.stats.panics, 1);
                tracing::error!(output = %self.name, "filter chain panicked, event discarded");
                return;
            }
        }

        match event.to_json_string() {
            Ok(message) => self.enqueue(message),
            Err(e) => {
                bump(&self.stats.lost, 1);
                tracing::warn!(output = %self.name, error = %e, "failed to serialize event");
            }
        }
    }

    fn enqueue(&self, message: String) {
        bump(&self.stats.enqueued, 1);
        if self.queue.push(message) {
            bump(&self.stats.overflow_dropped, 1);
        }
    }

    /// 통계 스냅샷
    pub fn stats(&self) -> OutputStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        OutputStats {
            received: load(&self.stats.received),
            filtered: load(&self.stats.filtered),
            enqueued: load(&self.stats.enqueued),
            delivered: load(&self.stats.delivered),
            failed_cycles: load(&self.stats.failed_cycles),
            lost: load(&self.stats.lost),
            overflow_dropped: load(&self.stats.overflow_dropped),
            panics: load(&self.stats.panics),
            queue_len: u64::try_from(self.queue.len()).unwrap_or(u64::MAX),
        }
    }

    fn is_degraded(&self) -> bool {
        self.stats.degraded.load(Ordering::Relaxed)
    }
}

impl EventHandler for SenderCore {
    fn on_event(&self, event: Event) {
        self.receive(event);
    }
}

/// 송신 루프
///
/// 호스트 순환 상태는 이 구조체만 소유하므로 동기화가 필요 없습니다.
pub struct DeliveryWorker<T: Transport> {
    core: Arc<SenderCore>,
    transport: Arc<T>,
    rotation: HostRotation,
    port: u16,
    timeout: Duration,
    target: String,
}

impl<T: Transport> DeliveryWorker<T> {
    /// 송신 루프를 만듭니다.
    pub fn new(
        core: Arc<SenderCore>,
        transport: Arc<T>,
        rotation: HostRotation,
        port: u16,
        timeout: Duration,
        target: impl Into<String>,
    ) -> Self {
        Self {
            core,
            transport,
            rotation,
            port,
            timeout,
            target: target.into(),
        }
    }

    /// 호스트 순환 상태
    pub fn rotation(&self) -> &HostRotation {
        &self.rotation
    }

    /// 플러시 사이클 하나를 실행합니다.
    ///
    /// 큐 전체를 드레인한 뒤, 최대 호스트 수만큼 라운드 로빈으로 전달을 시도합니다.
    /// 취소 신호는 각 시도 전에 확인하며, 진행 중인 전송은 중단하지 않습니다.
    pub async fn flush_cycle(&mut self, cancel: &CancellationToken) -> CycleOutcome {
        let batch = self.core.queue.drain();
        if batch.is_empty() {
            return CycleOutcome::Empty;
        }
        let count = batch.len();
        let output = self.core.name.as_str();

        for attempt in 1..=self.rotation.len() {
            if cancel.is_cancelled() {
                bump(&self.core.stats.lost, count);
                tracing::warn!(output, count, "cancelled during flush, batch abandoned");
                return CycleOutcome::Cancelled { count };
            }

            let host = self.rotation.advance().to_owned();
            let send = self.transport.send_batch(
                &host,
                self.port,
                self.timeout,
                &self.target,
                &batch,
            );
            match tokio::time::timeout(self.timeout, send).await {
                Ok(Ok(())) => {
                    bump(&self.core.stats.delivered, count);
                    self.core.stats.degraded.store(false, Ordering::Relaxed);
                    tracing::debug!(output, host = %host, count, "batch delivered");
                    return CycleOutcome::Delivered { host, count };
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        output,
                        host = %host,
                        attempt,
                        transport = self.transport.name(),
                        error = %e,
                        "delivery attempt failed"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        output,
                        host = %host,
                        attempt,
                        timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                        "delivery attempt timed out"
                    );
                }
            }
        }

        bump(&self.core.stats.lost, count);
        bump(&self.core.stats.failed_cycles, 1);
        self.core.stats.degraded.store(true, Ordering::Relaxed);
        tracing::error!(
            fatal = true,
            output,
            hosts = %self.rotation.hosts().join(","),
            count,
            "unable to deliver batch to any host, batch dropped"
        );
        CycleOutcome::Exhausted { count }
    }

    /// 취소될 때까지 `interval`마다 플러시 사이클을 실행합니다.
    pub async fn run(mut self, cancel: CancellationToken, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 첫 tick은 즉시 완료되므로 한 주기를 기다린 뒤 시작합니다.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush_cycle(&cancel).await;
                }
            }
        }

        tracing::debug!(output = %self.core.name, "delivery loop exited");
    }
}

/// 출력 전송기
pub struct OutputSender<T: Transport> {
    config: OutputConfig,
    core: Arc<SenderCore>,
    transport: Arc<T>,
    rotation: Option<HostRotation>,
    state: SenderState,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl<T: Transport> OutputSender<T> {
    /// 설정, 공유 필터 체인, 전송 방식으로 전송기를 만듭니다.
    ///
    /// `cancel`은 루트 취소 토큰의 자식이어야 합니다. 호스트 목록이 비어 있으면
    /// 네트워크가 필요 없는 전송 방식으로 보고 [`LOCAL_HOST`] 하나를 사용합니다.
    pub fn new(
        config: OutputConfig,
        chain: Arc<FilterChain>,
        transport: T,
        cancel: CancellationToken,
    ) -> Result<Self, LogPipelineError> {
        let hosts = if config.hosts.is_empty() {
            if config.kind.is_networked() {
                return Err(LogPipelineError::FilterConfig {
                    field: format!("outputs.{}.hosts", config.name),
                    reason: "networked outputs need at least one host".to_owned(),
                });
            }
            vec![LOCAL_HOST.to_owned()]
        } else {
            config.hosts.clone()
        };
        let rotation = HostRotation::new(hosts);

        let queue = PendingQueue::new(config.queue_capacity, config.drop_policy);
        let core = Arc::new(SenderCore::new(config.name.clone(), chain, queue));

        Ok(Self {
            config,
            core,
            transport: Arc::new(transport),
            rotation,
            state: SenderState::Idle,
            cancel,
            worker: None,
        })
    }

    /// 현재 상태
    pub fn state(&self) -> SenderState {
        self.state
    }

    /// 공유 상태 (수신 핸들러)
    pub fn core(&self) -> &Arc<SenderCore> {
        &self.core
    }

    /// `announce`가 설정된 경우 시작 메타데이터를 큐 끝에 적재합니다.
    ///
    /// 이벤트보다 먼저 전달되려면 리스너에 연결하기 전에 호출해야 합니다.
    /// 이 문서는 `enqueued`에는 집계되지만 `received`에는 집계되지 않습니다.
    /// 적재했으면 `true`를 반환합니다.
    pub fn startup(&self, metadata: &StartupMetadata) -> bool {
        if !self.config.announce {
            return false;
        }
        match serde_json::to_string(metadata) {
            Ok(document) => {
                self.core.enqueue(document);
                tracing::info!(output = %self.config.name, host = %metadata.host, "startup metadata queued");
                true
            }
            Err(e) => {
                tracing::warn!(output = %self.config.name, error = %e, "failed to serialize startup metadata");
                false
            }
        }
    }

    fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.config.flush_interval_ms.max(1))
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms.max(1))
    }
}

impl<T: Transport> Pipeline for OutputSender<T> {
    async fn start(&mut self) -> Result<(), LogshipError> {
        match self.state {
            SenderState::Idle => {}
            SenderState::Running | SenderState::Draining => {
                return Err(PipelineError::AlreadyRunning.into());
            }
            SenderState::Stopped => {
                return Err(PipelineError::InitFailed(format!(
                    "output '{}' was stopped and cannot be restarted",
                    self.config.name
                ))
                .into());
            }
        }

        let rotation = self.rotation.take().ok_or_else(|| {
            PipelineError::InitFailed(format!("output '{}' has no hosts", self.config.name))
        })?;

        tracing::info!(
            output = %self.config.name,
            kind = ?self.config.kind,
            transport = self.transport.name(),
            hosts = rotation.len(),
            "starting output sender"
        );

        let worker = DeliveryWorker::new(
            Arc::clone(&self.core),
            Arc::clone(&self.transport),
            rotation,
            self.config.port,
            self.timeout(),
            self.config.target.clone(),
        );
        let cancel = self.cancel.clone();
        let interval = self.flush_interval();
        self.worker = Some(tokio::spawn(worker.run(cancel, interval)));

        self.state = SenderState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogshipError> {
        if self.state != SenderState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!(output = %self.config.name, "stopping output sender");
        self.state = SenderState::Draining;
        self.cancel.cancel();

        if let Some(worker) = self.worker.take()
            && let Err(e) = worker.await
        {
            tracing::error!(output = %self.config.name, error = %e, "delivery loop task failed");
        }

        let abandoned = self.core.queue.drain().len();
        if abandoned > 0 {
            bump(&self.core.stats.lost, abandoned);
            tracing::warn!(
                output = %self.config.name,
                count = abandoned,
                "messages left in queue at shutdown were not delivered"
            );
        }

        self.state = SenderState::Stopped;
        tracing::info!(output = %self.config.name, "output sender stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            SenderState::Running if self.core.is_degraded() => HealthStatus::Degraded(
                "last flush cycle could not reach any host".to_owned(),
            ),
            SenderState::Running => HealthStatus::Healthy,
            SenderState::Idle => HealthStatus::Unhealthy("not started".to_owned()),
            SenderState::Draining => HealthStatus::Unhealthy("draining".to_owned()),
            SenderState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

impl<T: Transport> Output for OutputSender<T> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn handler(&self) -> Arc<dyn EventHandler> {
        self.core.clone()
    }

    fn stats(&self) -> OutputStats {
        self.core.stats()
    }
}
