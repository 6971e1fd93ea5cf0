//! 입력 리스너 -- 외부 소스에서 이벤트를 받아 구독자에게 방출합니다.
//!
//! # 리스너
//! - [`TcpListenerInput`]: 줄 단위 TCP 수신 (연결마다 별도 태스크)
//! - [`UdpListenerInput`]: 데이터그램 하나가 이벤트 하나
//! - [`StdinListenerInput`]: 표준 입력의 각 줄
//!
//! # 이벤트 변환
//! JSON 객체로 파싱되는 줄은 그 객체가 곧 이벤트가 되고, 나머지는
//! `{message: <line>}` 이벤트가 됩니다. 설정된 `type`과 에이전트 `host`는
//! 이벤트에 해당 필드가 없을 때만 채웁니다.
//!
//! # 아키텍처
//! 각 리스너는 `start`에서 자체 tokio 태스크를 띄우고, 수신한 이벤트를
//! [`EventFanout`]을 통해 구독한 모든 [`EventHandler`]에 동기적으로 전달합니다.

pub mod stdin;
pub mod tcp;
pub mod udp;

pub use stdin::StdinListenerInput;
pub use tcp::TcpListenerInput;
pub use udp::UdpListenerInput;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use logship_core::config::InputConfig;
use logship_core::error::{LogshipError, PipelineError};
use logship_core::event::{Event, FIELD_HOST, FIELD_MESSAGE, FIELD_TYPE};
use logship_core::pipeline::{EventHandler, HealthStatus, Listener};

/// 구독자 목록
///
/// 구독자마다 자신의 [`Event`]를 받습니다. 마지막 구독자를 제외하고는 복제본을 받습니다.
#[derive(Clone, Default)]
pub struct EventFanout {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventFanout {
    /// 빈 목록을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 구독자를 추가합니다.
    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.handlers.push(handler);
    }

    /// 구독자 수
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// 구독자가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// 이벤트를 모든 구독자에게 전달합니다.
    pub fn emit(&self, event: Event) {
        let Some((last, rest)) = self.handlers.split_last() else {
            return;
        };
        for handler in rest {
            handler.on_event(event.clone());
        }
        last.on_event(event);
    }
}

impl fmt::Debug for EventFanout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventFanout")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

/// 수신한 이벤트에 붙일 기본 필드
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestTags {
    /// `type` 필드가 없을 때 채울 값
    pub event_type: Option<String>,
    /// `host` 필드가 없을 때 채울 값
    pub host: String,
}

impl IngestTags {
    /// 새 태그를 생성합니다.
    pub fn new(event_type: Option<String>, host: impl Into<String>) -> Self {
        Self {
            event_type,
            host: host.into(),
        }
    }

    /// 없는 필드만 채웁니다.
    pub fn apply(&self, event: &mut Event) {
        if let Some(event_type) = &self.event_type
            && !event.contains(FIELD_TYPE)
        {
            event.insert(FIELD_TYPE, event_type.as_str());
        }
        if !self.host.is_empty() && !event.contains(FIELD_HOST) {
            event.insert(FIELD_HOST, self.host.as_str());
        }
    }
}

/// 수신한 한 줄을 이벤트로 변환합니다. 빈 줄이면 `None`입니다.
pub fn line_to_event(line: &str, tags: &IngestTags) -> Option<Event> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let mut event = if line.trim_start().starts_with('{') {
        Event::from_json_str(line).unwrap_or_else(|_| message_event(line))
    } else {
        message_event(line)
    };
    tags.apply(&mut event);
    Some(event)
}

fn message_event(line: &str) -> Event {
    let mut event = Event::new();
    event.insert(FIELD_MESSAGE, line);
    event
}

/// 리스너 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 정지됨 (재시작 불가)
    Stopped,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// 리스너 공통 생명주기: 상태, 취소 토큰, 수신 태스크
#[derive(Debug)]
pub(crate) struct ListenerRuntime {
    name: String,
    state: ListenerState,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    fanout: EventFanout,
}

impl ListenerRuntime {
    pub(crate) fn new(name: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            name: name.into(),
            state: ListenerState::Idle,
            cancel,
            task: None,
            fanout: EventFanout::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> ListenerState {
        self.state
    }

    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        if self.state != ListenerState::Idle {
            tracing::warn!(listener = %self.name, "subscribe after start is ignored");
            return;
        }
        self.fanout.subscribe(handler);
    }

    /// 등록된 구독자 수
    pub(crate) fn subscribers(&self) -> usize {
        self.fanout.len()
    }

    /// 시작 가능한지 확인하고 방출용 fanout을 돌려줍니다.
    pub(crate) fn begin(&self) -> Result<Arc<EventFanout>, LogshipError> {
        match self.state {
            ListenerState::Idle => Ok(Arc::new(self.fanout.clone())),
            ListenerState::Running => Err(PipelineError::AlreadyRunning.into()),
            ListenerState::Stopped => Err(PipelineError::InitFailed(format!(
                "listener '{}' cannot be restarted",
                self.name
            ))
            .into()),
        }
    }

    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.task = Some(tokio::spawn(task));
        self.state = ListenerState::Running;
        info!(listener = %self.name, subscribers = self.fanout.len(), "listener started");
    }

    pub(crate) async fn stop(&mut self) -> Result<(), LogshipError> {
        if self.state != ListenerState::Running {
            return Err(PipelineError::NotRunning.into());
        }
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            debug!(listener = %self.name, error = %e, "listener task ended abnormally");
        }
        self.state = ListenerState::Stopped;
        info!(listener = %self.name, "listener stopped");
        Ok(())
    }

    pub(crate) fn health(&self) -> HealthStatus {
        match self.state {
            ListenerState::Running => {
                if self.task.as_ref().is_some_and(JoinHandle::is_finished) {
                    HealthStatus::Unhealthy("receive task exited".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            ListenerState::Idle => HealthStatus::Unhealthy("not started".to_owned()),
            ListenerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 입력 설정으로 리스너를 생성합니다.
pub fn build_listener(
    config: &InputConfig,
    hostname: &str,
    cancel: CancellationToken,
) -> Box<dyn Listener> {
    match config {
        InputConfig::Tcp(c) => Box::new(TcpListenerInput::new(c.clone(), hostname, cancel)),
        InputConfig::Udp(c) => Box::new(UdpListenerInput::new(c.clone(), hostname, cancel)),
        InputConfig::Stdin(c) => Box::new(StdinListenerInput::new(c.clone(), hostname, cancel)),
    }
}
