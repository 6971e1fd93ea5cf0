//! 콘솔 전송 -- 메시지를 한 줄씩 비동기 writer에 씁니다.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use logship_core::error::TransportError;
use logship_core::pipeline::Transport;

/// 콘솔 전송. 호스트, 포트, 타겟은 무시합니다.
pub struct ConsoleTransport<W> {
    writer: Mutex<W>,
}

impl ConsoleTransport<tokio::io::Stdout> {
    /// 표준 출력에 쓰는 전송
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// 임의의 writer로 전송을 만듭니다.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// 내부 writer를 돌려받습니다.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W> Transport for ConsoleTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn name(&self) -> &str {
        "console"
    }

    async fn send_batch(
        &self,
        _host: &str,
        _port: u16,
        _timeout: Duration,
        _target: &str,
        messages: &[String],
    ) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        for message in messages {
            writer.write_all(message.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_one_line_per_message() {
        let transport = ConsoleTransport::new(Vec::new());
        let batch = vec!["{\"a\":1}".to_owned(), "{\"b\":2}".to_owned()];
        transport
            .send_batch("ignored", 0, Duration::from_secs(1), "ignored", &batch)
            .await
            .unwrap();
        transport
            .send_batch("ignored", 0, Duration::from_secs(1), "ignored", &batch[..1])
            .await
            .unwrap();

        let written = String::from_utf8(transport.into_inner()).unwrap();
        assert_eq!(written, "{\"a\":1}\n{\"b\":2}\n{\"a\":1}\n");
    }
}
