//! 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 필터 체인 구성, 패턴 해석, 입력 수집 중 발생하는 에러를 표현합니다.
//! `From<LogPipelineError> for LogshipError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 이벤트 단위의 불일치(필드 없음, 매치 실패, 날짜 파싱 실패)는 에러가 아니라
//! [`FilterOutcome`](crate::filter::FilterOutcome)으로 보고됩니다.

use logship_core::error::{ConfigError, LogshipError, PipelineError};

/// 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 라이브러리에 없는 하위 패턴 참조
    #[error("unknown pattern reference '%{{{name}}}' in '{expression}'")]
    UnknownPattern {
        /// 참조된 패턴 이름
        name: String,
        /// 원래 표현식
        expression: String,
    },

    /// 패턴 해석 실패 (잘못된 참조 문법, 순환 참조 등)
    #[error("pattern error in '{expression}': {reason}")]
    Pattern {
        /// 원래 표현식
        expression: String,
        /// 실패 사유
        reason: String,
    },

    /// 조건식 파싱 실패
    #[error("invalid condition '{expression}' at offset {offset}: {reason}")]
    Condition {
        /// 조건식 원문
        expression: String,
        /// 실패 위치 (바이트 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
    },

    /// 필터 설정 에러
    #[error("filter config error: {field}: {reason}")]
    FilterConfig {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 수집기 에러 (바인드 실패 등)
    #[error("collector error: {source_type}: {reason}")]
    Collector {
        /// 수집 소스 유형 (tcp, udp, stdin)
        source_type: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for LogshipError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::FilterConfig { field, reason } => {
                LogshipError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::Io(e) => LogshipError::Io(e),
            LogPipelineError::Channel(reason) => {
                LogshipError::Pipeline(PipelineError::ChannelSend(reason))
            }
            other => LogshipError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
