//! logship 파이프라인 크레이트
//!
//! # 모듈 구성
//!
//! - [`pattern`]: Grok 패턴 해석기와 내장 패턴 라이브러리
//! - [`filter`]: 조건식, Grok/Date/Mutate 필터, 필터 체인
//! - [`output`]: 대기 큐, 호스트 로테이션, 출력 전송기와 송신 루프
//! - [`transport`]: 배치 전송 구현 (Redis `RPUSH`, 콘솔)
//! - [`collector`]: 입력 리스너 (TCP, UDP, stdin)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Listener --on_event--> SenderCore --FilterChain--> PendingQueue
//!                                                        |
//!                              DeliveryWorker (interval) drain
//!                                                        |
//!                                 HostRotation -> Transport::send_batch
//! ```

pub mod collector;
pub mod error;
pub mod filter;
pub mod output;
pub mod pattern;
pub mod transport;

// --- 주요 타입 re-export ---

// 에러
pub use error::LogPipelineError;

// 패턴
pub use pattern::{CompiledPattern, PatternResolver};

// 필터
pub use filter::{
    ChainResult, Condition, DateFilter, Filter, FilterChain, FilterGate, FilterOutcome,
    GrokFilter, MutateFilter,
};

// 출력
pub use output::{
    CycleOutcome, DeliveryWorker, HostRotation, OutputSender, PendingQueue, SenderCore,
    SenderState, StartupMetadata,
};

// 전송
pub use transport::{ConsoleTransport, RedisTransport};

// 리스너
pub use collector::{
    EventFanout, IngestTags, ListenerState, StdinListenerInput, TcpListenerInput,
    UdpListenerInput, build_listener,
};
