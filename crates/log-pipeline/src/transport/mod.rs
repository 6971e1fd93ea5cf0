//! 전송 방식
//!
//! [`Transport`](logship_core::pipeline::Transport)의 구현체입니다.
//! - [`RedisTransport`]: Redis 리스트에 `RPUSH`
//! - [`ConsoleTransport`]: 한 줄에 메시지 하나씩 쓰기 (운영 환경에서는 stdout)
//!
//! 검색 인덱스(HTTP bulk)용 전송은 포함하지 않습니다. 필요하면 같은 trait을 구현해
//! [`OutputSender`](crate::output::OutputSender)에 넘기면 됩니다.

pub mod console;
pub mod redis;

pub use console::ConsoleTransport;
pub use redis::RedisTransport;
