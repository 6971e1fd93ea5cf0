//! 출력 전송기
//!
//! - [`queue`]: 수신 핸들러와 송신 루프 사이의 대기 큐
//! - [`rotation`]: 호스트 라운드 로빈
//! - [`sender`]: [`OutputSender`], [`DeliveryWorker`], 시작 메타데이터

pub mod queue;
pub mod rotation;
pub mod sender;

pub use queue::PendingQueue;
pub use rotation::HostRotation;
pub use sender::{
    CycleOutcome, DeliveryWorker, OutputSender, STARTUP_EVENT_TYPE, SenderCore, SenderState,
    StartupMetadata,
};
