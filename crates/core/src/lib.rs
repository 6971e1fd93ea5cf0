//! logship 공통 크레이트
//!
//! 이벤트 모델, 컴포넌트 간 trait, 에러 분류, 설정, 메트릭 이름을 정의합니다.
//! 파이프라인과 데몬 크레이트가 모두 이 크레이트에 의존합니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LogshipError, PipelineError, TransportError};

// 설정
pub use config::LogshipConfig;

// 이벤트
pub use event::{Event, Value};

// 파이프라인 trait
pub use pipeline::{
    DynPipeline, EventHandler, HealthStatus, Listener, Output, OutputStats, Pipeline, Transport,
};
