//! 표준 입력 리스너 -- 각 줄을 이벤트로 방출합니다.
//!
//! 테스트와 파이프 연결을 위해 임의의 [`AsyncBufRead`] 소스도 받습니다.
//! 입력이 EOF에 도달하면 수신 태스크는 종료되고 상태는 `Unhealthy`로 보고됩니다.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logship_core::config::StdinInputConfig;
use logship_core::error::{LogshipError, PipelineError};
use logship_core::pipeline::{EventHandler, HealthStatus, Listener, Pipeline};

use super::{EventFanout, IngestTags, ListenerRuntime, ListenerState, line_to_event};

type LineSource = Box<dyn AsyncBufRead + Send + Unpin>;

/// 표준 입력 리스너
pub struct StdinListenerInput {
    tags: IngestTags,
    runtime: ListenerRuntime,
    source: Mutex<Option<LineSource>>,
}

impl StdinListenerInput {
    /// 프로세스 표준 입력을 읽는 리스너
    pub fn new(config: StdinInputConfig, hostname: &str, cancel: CancellationToken) -> Self {
        Self::with_source(config, hostname, cancel, BufReader::new(tokio::io::stdin()))
    }

    /// 임의의 줄 단위 소스를 읽는 리스너
    pub fn with_source<R>(
        config: StdinInputConfig,
        hostname: &str,
        cancel: CancellationToken,
        source: R,
    ) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Self {
            tags: IngestTags::new(config.event_type, hostname),
            runtime: ListenerRuntime::new(config.name, cancel),
            source: Mutex::new(Some(Box::new(source))),
        }
    }

    /// 현재 상태
    pub fn state(&self) -> ListenerState {
        self.runtime.state()
    }

    async fn read_loop(
        mut source: LineSource,
        name: String,
        tags: IngestTags,
        fanout: Arc<EventFanout>,
        cancel: CancellationToken,
    ) {
        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(listener = %name, "stdin listener received shutdown signal");
                    break;
                }
                result = source.read_line(&mut line) => {
                    match result {
                        Ok(0) => {
                            info!(listener = %name, "stdin reached end of input");
                            break;
                        }
                        Ok(_) => {
                            if let Some(event) = line_to_event(&line, &tags) {
                                fanout.emit(event);
                            }
                        }
                        Err(e) => {
                            warn!(listener = %name, error = %e, "stdin read failed");
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl Pipeline for StdinListenerInput {
    async fn start(&mut self) -> Result<(), LogshipError> {
        let fanout = self.runtime.begin()?;
        let source = self
            .source
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
            .ok_or_else(|| PipelineError::InitFailed("stdin source already consumed".to_owned()))?;

        let task = Self::read_loop(
            source,
            self.runtime.name().to_owned(),
            self.tags.clone(),
            fanout,
            self.runtime.cancel_token(),
        );
        self.runtime.spawn(task);
        info!(
            listener = %self.runtime.name(),
            subscribers = self.runtime.subscribers(),
            "stdin listener started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogshipError> {
        self.runtime.stop().await
    }

    async fn health_check(&self) -> HealthStatus {
        self.runtime.health()
    }
}

impl Listener for StdinListenerInput {
    fn name(&self) -> &str {
        self.runtime.name()
    }

    fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        self.runtime.subscribe(handler);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::tests::Collecting;
    use super::*;

    #[tokio::test]
    async fn reads_lines_until_eof() {
        let sink = Arc::new(Collecting::default());
        let config = StdinInputConfig {
            name: "stdin".to_owned(),
            event_type: Some("console".to_owned()),
        };
        let input_text: &'static [u8] = b"one\n\ntwo\n{\"message\":\"three\"}";
        let mut input =
            StdinListenerInput::with_source(config, "agent", CancellationToken::new(), input_text);
        input.subscribe(sink.clone());
        Pipeline::start(&mut input).await.unwrap();

        for _ in 0..200 {
            if sink.taken().len() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let messages: Vec<String> = sink
            .taken()
            .iter()
            .filter_map(|e| e.get_text("message").map(|m| m.into_owned()))
            .collect();
        assert_eq!(messages, vec!["one", "two", "three"]);
        assert!(sink.taken().iter().all(|e| e.event_type() == Some("console")));

        // EOF 이후 수신 태스크가 끝나 비정상으로 보고됩니다.
        for _ in 0..200 {
            if Pipeline::health_check(&input).await.is_unhealthy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(Pipeline::health_check(&input).await.is_unhealthy());
        Pipeline::stop(&mut input).await.unwrap();
    }
}
