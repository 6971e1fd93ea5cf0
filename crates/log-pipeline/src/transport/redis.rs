//! Redis 리스트 전송 (`RPUSH`)
//!
//! 배치 전체를 하나의 `RPUSH <target> m1 ... mN` 명령으로 보냅니다.
//! 단일 명령이므로 서버 측에서 원자적으로 추가됩니다.
//! 정수 응답(`:n`)은 성공, 에러 응답(`-ERR ...`)은 [`TransportError::Protocol`]입니다.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use logship_core::error::TransportError;
use logship_core::pipeline::Transport;

/// 응답 한 줄의 최대 길이
const MAX_REPLY_LINE: usize = 4096;

/// `RPUSH` 명령을 RESP 배열로 인코딩합니다.
pub fn encode_rpush(target: &str, messages: &[String]) -> Bytes {
    let payload: usize = messages.iter().map(|m| m.len() + 16).sum();
    let mut buf = BytesMut::with_capacity(payload + target.len() + 32);

    buf.put_slice(format!("*{}\r\n", messages.len() + 2).as_bytes());
    put_bulk(&mut buf, b"RPUSH");
    put_bulk(&mut buf, target.as_bytes());
    for message in messages {
        put_bulk(&mut buf, message.as_bytes());
    }
    buf.freeze()
}

fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
    buf.put_slice(format!("${}\r\n", data.len()).as_bytes());
    buf.put_slice(data);
    buf.put_slice(b"\r\n");
}

/// 응답 한 줄을 해석합니다. 정수 응답이면 리스트 길이를 돌려줍니다.
pub fn parse_reply(line: &str) -> Result<i64, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    match line.as_bytes().first() {
        Some(b':') => line[1..]
            .parse::<i64>()
            .map_err(|_| format!("malformed integer reply '{line}'")),
        Some(b'-') => Err(line[1..].to_owned()),
        Some(_) => Err(format!("unexpected reply '{line}'")),
        None => Err("connection closed before reply".to_owned()),
    }
}

/// Redis 전송
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisTransport;

impl RedisTransport {
    /// 새 전송을 생성합니다.
    pub fn new() -> Self {
        Self
    }

    async fn push(
        host: &str,
        port: u16,
        timeout: Duration,
        target: &str,
        messages: &[String],
    ) -> Result<(), TransportError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let connect = TcpStream::connect((host, port));
        let mut stream = match tokio::time::timeout(timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(TransportError::Connect {
                    host: host.to_owned(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(TransportError::Timeout {
                    host: host.to_owned(),
                    timeout_ms,
                });
            }
        };
        stream.set_nodelay(true)?;

        let command = encode_rpush(target, messages);
        stream.write_all(&command).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream).take(MAX_REPLY_LINE as u64);
        let mut line = String::new();
        reader.read_line(&mut line).await?;

        match parse_reply(&line) {
            Ok(len) => {
                tracing::trace!(host, target, count = messages.len(), list_len = len, "rpush ok");
                Ok(())
            }
            Err(reason) => Err(TransportError::Protocol {
                host: host.to_owned(),
                reason,
            }),
        }
    }
}

impl Transport for RedisTransport {
    fn name(&self) -> &str {
        "redis"
    }

    async fn send_batch(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
        target: &str,
        messages: &[String],
    ) -> Result<(), TransportError> {
        if messages.is_empty() {
            return Ok(());
        }
        Self::push(host, port, timeout, target, messages).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    fn messages(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encodes_resp_array() {
        let encoded = encode_rpush("logstash", &messages(&["{\"a\":1}", "xy"]));
        assert_eq!(
            &encoded[..],
            b"*4\r\n$5\r\nRPUSH\r\n$8\r\nlogstash\r\n$7\r\n{\"a\":1}\r\n$2\r\nxy\r\n"
        );
    }

    #[test]
    fn bulk_length_counts_bytes() {
        let encoded = encode_rpush("q", &messages(&["한글"]));
        assert!(encoded.windows(4).any(|w| w == b"$6\r\n"));
    }

    #[test]
    fn reply_parsing() {
        assert_eq!(parse_reply(":3\r\n"), Ok(3));
        assert_eq!(
            parse_reply("-WRONGTYPE Operation against a key\r\n"),
            Err("WRONGTYPE Operation against a key".to_owned())
        );
        assert!(parse_reply("+OK\r\n").is_err());
        assert!(parse_reply(":abc\r\n").is_err());
        assert!(parse_reply("").is_err());
    }

    /// 명령 하나를 받고 지정된 응답을 돌려주는 가짜 Redis
    async fn fake_redis(reply: &'static [u8], expected: Bytes) -> (u16, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = vec![0u8; expected.len()];
            socket.read_exact(&mut received).await.unwrap();
            assert_eq!(received, expected.to_vec());
            socket.write_all(reply).await.unwrap();
        });
        (port, handle)
    }

    #[tokio::test]
    async fn integer_reply_is_success() {
        let batch = messages(&["one", "two"]);
        let (port, server) = fake_redis(b":2\r\n", encode_rpush("logstash", &batch)).await;

        let result = RedisTransport::new()
            .send_batch("127.0.0.1", port, Duration::from_secs(2), "logstash", &batch)
            .await;
        assert!(result.is_ok(), "{result:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn error_reply_is_protocol_error() {
        let batch = messages(&["one"]);
        let (port, server) = fake_redis(b"-ERR wrong type\r\n", encode_rpush("q", &batch)).await;

        let result = RedisTransport::new()
            .send_batch("127.0.0.1", port, Duration::from_secs(2), "q", &batch)
            .await;
        match result {
            Err(TransportError::Protocol { host, reason }) => {
                assert_eq!(host, "127.0.0.1");
                assert!(reason.contains("wrong type"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = RedisTransport::new()
            .send_batch("127.0.0.1", port, Duration::from_secs(2), "q", &messages(&["x"]))
            .await;
        assert!(matches!(result, Err(TransportError::Connect { .. })), "{result:?}");
    }

    #[tokio::test]
    async fn empty_batch_does_not_connect() {
        // 포트 1에는 보통 아무것도 없지만 연결을 시도하지 않으므로 성공합니다.
        let result = RedisTransport::new()
            .send_batch("127.0.0.1", 1, Duration::from_millis(10), "q", &[])
            .await;
        assert!(result.is_ok());
    }
}
