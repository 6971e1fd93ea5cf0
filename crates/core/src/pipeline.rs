//! 파이프라인 trait: 모듈 확장 포인트 정의
//!
//! - [`Pipeline`] / [`DynPipeline`]: 리스너와 출력 전송기의 생명주기
//! - [`EventHandler`]: 리스너가 이벤트를 전달하는 콜백
//! - [`Listener`]: 이벤트 생산자의 구독 계약
//! - [`Output`]: 매니저가 출력 전송기를 동적으로 다루기 위한 계약
//! - [`Transport`]: 출력 전송기가 필요로 하는 유일한 전송 기본 연산

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LogshipError, TransportError};
use crate::event::Event;

/// `Send` 가능한 박스 퓨처
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 컴포넌트 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 문제가 있음
    Degraded(String),
    /// 동작하지 않음
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }

    /// 두 상태 중 더 나쁜 쪽을 반환합니다.
    ///
    /// 여러 컴포넌트의 상태를 하나로 집계할 때 사용합니다.
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        fn rank(status: &HealthStatus) -> u8 {
            match status {
                HealthStatus::Healthy => 0,
                HealthStatus::Degraded(_) => 1,
                HealthStatus::Unhealthy(_) => 2,
            }
        }
        if rank(&other) > rank(&self) { other } else { self }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 시작/정지 생명주기를 가진 컴포넌트
///
/// RPITIT를 사용하므로 `dyn Pipeline`은 불가합니다.
/// 동적 디스패치가 필요하면 [`DynPipeline`]을 사용합니다.
pub trait Pipeline: Send + Sync {
    /// 컴포넌트를 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LogshipError>> + Send;

    /// 컴포넌트를 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LogshipError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// dyn-compatible 파이프라인 trait
///
/// [`Pipeline`]을 구현한 타입은 자동으로 `DynPipeline`도 구현됩니다.
pub trait DynPipeline: Send + Sync {
    /// 컴포넌트를 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), LogshipError>>;

    /// 컴포넌트를 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogshipError>>;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), LogshipError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), LogshipError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

/// 리스너가 방출한 이벤트를 받는 콜백
///
/// 여러 리스너 태스크에서 동시에 호출될 수 있으며, 호출자 태스크에서 동기적으로
/// 실행됩니다. 구현은 짧게 락을 잡는 것 이상으로 호출자를 막아서는 안 됩니다.
pub trait EventHandler: Send + Sync {
    /// 이벤트 하나를 처리합니다. 이벤트의 소유권은 핸들러로 넘어갑니다.
    fn on_event(&self, event: Event);
}

/// 이벤트 생산자
///
/// 구독한 핸들러에게 `start`부터 `stop`까지 0개 이상의 이벤트를 방출합니다.
/// 한 리스너 안에서는 FIFO 순서를 지킵니다.
pub trait Listener: DynPipeline {
    /// 리스너 이름
    fn name(&self) -> &str;

    /// 이벤트 핸들러를 등록합니다. `start` 전에 호출해야 합니다.
    fn subscribe(&mut self, handler: Arc<dyn EventHandler>);
}

/// 출력 전송기 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutputStats {
    /// 수신한 이벤트 수
    pub received: u64,
    /// 필터 체인이 드롭한 이벤트 수
    pub filtered: u64,
    /// 큐에 적재된 메시지 수 (시작 메타데이터 문서 포함)
    pub enqueued: u64,
    /// 전달에 성공한 메시지 수
    pub delivered: u64,
    /// 모든 호스트가 실패한 플러시 사이클 수
    pub failed_cycles: u64,
    /// 전달하지 못하고 버린 메시지 수
    pub lost: u64,
    /// 큐 용량 초과로 버린 메시지 수
    pub overflow_dropped: u64,
    /// 필터 실행 중 panic이 발생한 이벤트 수
    pub panics: u64,
    /// 현재 큐 길이
    pub queue_len: u64,
}

/// 매니저가 다루는 출력 전송기
pub trait Output: DynPipeline {
    /// 출력 이름
    fn name(&self) -> &str;

    /// 리스너에 등록할 수신 핸들러
    fn handler(&self) -> Arc<dyn EventHandler>;

    /// 통계 스냅샷
    fn stats(&self) -> OutputStats;

    /// 이 출력을 리스너의 구독자로 등록합니다.
    ///
    /// 하나의 출력은 여러 리스너에 연결될 수 있으며, 모든 리스너의 이벤트가
    /// 같은 수신 핸들러로 섞여 들어옵니다.
    fn connect(&self, listener: &mut dyn Listener) {
        listener.subscribe(self.handler());
    }
}

/// 배치 전송 기본 연산
///
/// 실패는 panic이 아니라 [`TransportError`] 결과 값으로 보고해야 합니다.
pub trait Transport: Send + Sync + 'static {
    /// 전송 방식 이름 (로그용)
    fn name(&self) -> &str;

    /// `messages` 전체를 `host:port`의 `target`으로 전송합니다.
    ///
    /// 전송 방식이 지원하면 배치를 하나의 원자적 연산으로 보냅니다.
    fn send_batch(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        target: &str,
        messages: &[String],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn worst_picks_most_severe() {
        let healthy = HealthStatus::Healthy;
        let degraded = HealthStatus::Degraded("slow".to_owned());
        let down = HealthStatus::Unhealthy("stopped".to_owned());

        assert_eq!(healthy.clone().worst(degraded.clone()), degraded);
        assert_eq!(degraded.clone().worst(healthy.clone()), degraded);
        assert_eq!(degraded.worst(down.clone()), down);
        assert!(HealthStatus::Healthy.worst(HealthStatus::Healthy).is_healthy());
    }

    #[test]
    fn health_display() {
        assert_eq!(HealthStatus::Healthy.to_string(), "healthy");
        assert_eq!(
            HealthStatus::Unhealthy("not running".to_owned()).to_string(),
            "unhealthy: not running"
        );
    }

    struct Toggle {
        running: bool,
    }

    impl Pipeline for Toggle {
        async fn start(&mut self) -> Result<(), LogshipError> {
            self.running = true;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), LogshipError> {
            self.running = false;
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            if self.running {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy("stopped".to_owned())
            }
        }
    }

    #[tokio::test]
    async fn pipeline_is_usable_as_trait_object() {
        let mut boxed: Box<dyn DynPipeline> = Box::new(Toggle { running: false });
        assert!(boxed.health_check().await.is_unhealthy());
        boxed.start().await.unwrap();
        assert!(boxed.health_check().await.is_healthy());
        boxed.stop().await.unwrap();
        assert!(boxed.health_check().await.is_unhealthy());
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    impl EventHandler for Recorder {
        fn on_event(&self, event: Event) {
            self.seen.lock().unwrap().push(event);
        }
    }

    struct FakeListener {
        handlers: Vec<Arc<dyn EventHandler>>,
    }

    impl Pipeline for FakeListener {
        async fn start(&mut self) -> Result<(), LogshipError> {
            for handler in &self.handlers {
                let mut event = Event::new();
                event.insert("message", "hello");
                handler.on_event(event);
            }
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), LogshipError> {
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            HealthStatus::Healthy
        }
    }

    impl Listener for FakeListener {
        fn name(&self) -> &str {
            "fake"
        }

        fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
            self.handlers.push(handler);
        }
    }

    struct FakeOutput {
        recorder: Arc<Recorder>,
    }

    impl Pipeline for FakeOutput {
        async fn start(&mut self) -> Result<(), LogshipError> {
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), LogshipError> {
            Ok(())
        }

        async fn health_check(&self) -> HealthStatus {
            HealthStatus::Healthy
        }
    }

    impl Output for FakeOutput {
        fn name(&self) -> &str {
            "fake-output"
        }

        fn handler(&self) -> Arc<dyn EventHandler> {
            self.recorder.clone()
        }

        fn stats(&self) -> OutputStats {
            OutputStats {
                received: self.recorder.seen.lock().unwrap().len() as u64,
                ..OutputStats::default()
            }
        }
    }

    #[tokio::test]
    async fn connect_subscribes_output_handler() {
        let output = FakeOutput {
            recorder: Arc::new(Recorder::default()),
        };
        let mut listener: Box<dyn Listener> = Box::new(FakeListener {
            handlers: Vec::new(),
        });

        output.connect(listener.as_mut());
        output.connect(listener.as_mut());
        listener.start().await.unwrap();

        assert_eq!(output.stats().received, 2);
    }
}
