//! 에러 타입: 도메인별 에러 정의

/// logship 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogshipError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 전송 에러
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("not running")]
    NotRunning,
}

/// 전송 에러
///
/// [`Transport::send_batch`](crate::pipeline::Transport::send_batch)의 결과 값으로만
/// 사용됩니다. 전송 경계를 넘어 panic으로 전파되지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// 연결 실패 (거부, DNS 실패 등)
    #[error("connect to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    /// 연결 또는 작업 타임아웃
    #[error("operation on {host} timed out after {timeout_ms}ms")]
    Timeout { host: String, timeout_ms: u64 },

    /// 프로토콜 수준 에러 (에러 응답, 잘못된 응답 형식)
    #[error("protocol error from {host}: {reason}")]
    Protocol { host: String, reason: String },

    /// 전송 중 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// 에러가 발생한 호스트를 반환합니다 (알 수 있는 경우).
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Connect { host, .. } | Self::Timeout { host, .. } | Self::Protocol { host, .. } => {
                Some(host)
            }
            Self::Io(_) => None,
        }
    }
}
