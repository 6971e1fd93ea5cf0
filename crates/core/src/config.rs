//! 설정 관리: logship.toml 파싱 및 런타임 설정
//!
//! [`LogshipConfig`]는 에이전트 전체 설정을 담는 최상위 구조체입니다.
//! 파이프라인 크레이트는 여기서 검증이 끝난 [`FilterConfig`] / [`OutputConfig`]만
//! 받아 사용합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSHIP_GENERAL_LOG_LEVEL=debug` 형식)
//! 3. 설정 파일 (`logship.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logship_core::error::LogshipError> {
//! use logship_core::config::LogshipConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = LogshipConfig::load("logship.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogshipConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogshipError};

/// logship 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogshipConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 메트릭 내보내기 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 사용자 정의 Grok 패턴 (이름 -> 정의)
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,
    /// 입력(리스너) 목록
    #[serde(default)]
    pub inputs: Vec<InputConfig>,
    /// 필터 체인 (설정 순서대로 적용)
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    /// 출력 전송기 목록
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

impl LogshipConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 읽습니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogshipError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogshipError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogshipError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogshipError> {
        toml::from_str(toml_str).map_err(|e| {
            LogshipError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSHIP_{SECTION}_{FIELD}`
    /// 파싱할 수 없는 값은 경고를 남기고 무시합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSHIP_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSHIP_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.hostname, "LOGSHIP_GENERAL_HOSTNAME");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGSHIP_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGSHIP_METRICS_LISTEN_ADDR");
        override_parsed(&mut self.metrics.port, "LOGSHIP_METRICS_PORT");
        override_parsed(
            &mut self.metrics.report_interval_secs,
            "LOGSHIP_METRICS_REPORT_INTERVAL_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 첫 번째로 발견한 문제를 필드 경로(`outputs[1].hosts` 등)와 함께 반환합니다.
    pub fn validate(&self) -> Result<(), LogshipError> {
        self.general.validate()?;
        self.metrics.validate()?;

        for (name, definition) in &self.patterns {
            if definition.is_empty() {
                return Err(invalid(
                    format!("patterns.{name}"),
                    "pattern definition must not be empty",
                ));
            }
        }

        let mut input_names = HashSet::new();
        for (idx, input) in self.inputs.iter().enumerate() {
            input.validate(idx)?;
            if !input_names.insert(input.name()) {
                return Err(invalid(
                    format!("inputs[{idx}].name"),
                    format!("duplicate input name '{}'", input.name()),
                ));
            }
        }

        for (idx, filter) in self.filters.iter().enumerate() {
            filter.validate(idx)?;
        }

        let mut output_names = HashSet::new();
        for (idx, output) in self.outputs.iter().enumerate() {
            output.validate(idx)?;
            if !output_names.insert(output.name.as_str()) {
                return Err(invalid(
                    format!("outputs[{idx}].name"),
                    format!("duplicate output name '{}'", output.name),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> LogshipError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
    .into()
}

// ─── General / Metrics ──────────────────────────────────────────────

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 이벤트와 시작 메타데이터에 기록할 호스트 이름 (비어 있으면 시스템 값)
    pub hostname: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            hostname: String::new(),
        }
    }
}

impl GeneralConfig {
    fn validate(&self) -> Result<(), LogshipError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        Ok(())
    }

    /// 실제로 사용할 호스트 이름을 반환합니다.
    ///
    /// 설정값이 비어 있으면 `HOSTNAME` / `COMPUTERNAME` 환경변수, 그것도 없으면
    /// `localhost`를 사용합니다.
    pub fn resolved_hostname(&self) -> String {
        if !self.hostname.is_empty() {
            return self.hostname.clone();
        }
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".to_owned())
    }
}

/// Prometheus 메트릭 내보내기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로 (`/metrics`만 지원)
    pub endpoint: String,
    /// 출력 전송기 통계 게시 주기 (초)
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
            report_interval_secs: 10,
        }
    }
}

impl MetricsConfig {
    fn validate(&self) -> Result<(), LogshipError> {
        if self.report_interval_secs == 0 {
            return Err(invalid(
                "metrics.report_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.enabled && self.port == 0 {
            return Err(invalid(
                "metrics.port",
                "must not be 0 when metrics are enabled",
            ));
        }
        Ok(())
    }
}

// ─── Inputs ─────────────────────────────────────────────────────────

/// 입력(리스너) 설정: `kind`로 구분
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InputConfig {
    /// 줄 단위 TCP 입력
    Tcp(TcpInputConfig),
    /// 데이터그램 단위 UDP 입력
    Udp(UdpInputConfig),
    /// 표준 입력
    Stdin(StdinInputConfig),
}

impl InputConfig {
    /// 입력 이름
    pub fn name(&self) -> &str {
        match self {
            Self::Tcp(c) => &c.name,
            Self::Udp(c) => &c.name,
            Self::Stdin(c) => &c.name,
        }
    }

    fn validate(&self, idx: usize) -> Result<(), LogshipError> {
        if self.name().is_empty() {
            return Err(invalid(format!("inputs[{idx}].name"), "must not be empty"));
        }
        let bind = match self {
            Self::Tcp(c) => Some(c.bind.as_str()),
            Self::Udp(c) => Some(c.bind.as_str()),
            Self::Stdin(_) => None,
        };
        if let Some(bind) = bind
            && bind.parse::<SocketAddr>().is_err()
        {
            return Err(invalid(
                format!("inputs[{idx}].bind"),
                format!("'{bind}' is not a valid socket address"),
            ));
        }
        if let Self::Tcp(c) = self {
            if c.max_connections == 0 {
                return Err(invalid(
                    format!("inputs[{idx}].max_connections"),
                    "must be greater than 0",
                ));
            }
            if c.max_line_length == 0 {
                return Err(invalid(
                    format!("inputs[{idx}].max_line_length"),
                    "must be greater than 0",
                ));
            }
        }
        Ok(())
    }
}

/// TCP 입력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpInputConfig {
    /// 입력 이름
    pub name: String,
    /// 바인드 주소
    pub bind: String,
    /// 이벤트에 `type` 필드가 없을 때 채울 값
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// 동시 연결 수 제한
    pub max_connections: usize,
    /// 유휴 연결 타임아웃 (초)
    pub idle_timeout_secs: u64,
    /// 한 줄의 최대 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for TcpInputConfig {
    fn default() -> Self {
        Self {
            name: "tcp".to_owned(),
            bind: "0.0.0.0:5140".to_owned(),
            event_type: None,
            max_connections: 256,
            idle_timeout_secs: 300,
            max_line_length: 64 * 1024,
        }
    }
}

/// UDP 입력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UdpInputConfig {
    /// 입력 이름
    pub name: String,
    /// 바인드 주소
    pub bind: String,
    /// 이벤트에 `type` 필드가 없을 때 채울 값
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

impl Default for UdpInputConfig {
    fn default() -> Self {
        Self {
            name: "udp".to_owned(),
            bind: "0.0.0.0:5141".to_owned(),
            event_type: None,
        }
    }
}

/// 표준 입력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StdinInputConfig {
    /// 입력 이름
    pub name: String,
    /// 이벤트에 `type` 필드가 없을 때 채울 값
    #[serde(rename = "type")]
    pub event_type: Option<String>,
}

impl Default for StdinInputConfig {
    fn default() -> Self {
        Self {
            name: "stdin".to_owned(),
            event_type: None,
        }
    }
}

// ─── Filters ────────────────────────────────────────────────────────

/// 필터 설정: `kind`로 구분
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FilterConfig {
    /// 패턴 추출
    Grok(GrokConfig),
    /// 날짜 파싱/정규화
    Date(DateConfig),
    /// 필드 변경
    Mutate(MutateConfig),
}

impl FilterConfig {
    /// 필터 종류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Grok(_) => "grok",
            Self::Date(_) => "date",
            Self::Mutate(_) => "mutate",
        }
    }

    fn validate(&self, idx: usize) -> Result<(), LogshipError> {
        match self {
            Self::Grok(c) => {
                if c.matches.is_empty() {
                    return Err(invalid(
                        format!("filters[{idx}].matches"),
                        "grok filter needs at least one match rule",
                    ));
                }
                for (rule_idx, rule) in c.matches.iter().enumerate() {
                    if rule.field.is_empty() || rule.pattern.is_empty() {
                        return Err(invalid(
                            format!("filters[{idx}].matches[{rule_idx}]"),
                            "field and pattern must not be empty",
                        ));
                    }
                }
            }
            Self::Date(c) => {
                if c.field.is_empty() {
                    return Err(invalid(format!("filters[{idx}].field"), "must not be empty"));
                }
                if c.target.is_empty() {
                    return Err(invalid(
                        format!("filters[{idx}].target"),
                        "must not be empty",
                    ));
                }
            }
            Self::Mutate(c) => {
                for (pair_idx, (field, delimiter)) in c.split.iter().enumerate() {
                    if field.is_empty() || delimiter.is_empty() {
                        return Err(invalid(
                            format!("filters[{idx}].split[{pair_idx}]"),
                            "field and delimiter must not be empty",
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Grok 매치 규칙 (소스 필드 + 패턴 표현식)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrokMatch {
    /// 매칭할 필드
    pub field: String,
    /// Grok 패턴 표현식
    pub pattern: String,
}

/// Grok 필터 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GrokConfig {
    /// 이 타입의 이벤트에만 적용
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// 적용 조건식
    pub condition: Option<String>,
    /// 매치 규칙 (설정 순서대로 시도)
    pub matches: Vec<GrokMatch>,
    /// 매치 성공 시 추가할 `(필드, 값 템플릿)` 쌍
    pub add_field: Vec<(String, String)>,
    /// 매치 성공 시 제거할 필드
    pub remove_field: Vec<String>,
    /// 매치 성공 시 이벤트를 버림
    pub drop_if_match: bool,
}

/// Date 필터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    /// 이 타입의 이벤트에만 적용
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// 적용 조건식
    pub condition: Option<String>,
    /// 소스 필드
    pub field: String,
    /// 결과를 쓸 필드
    pub target: String,
    /// 명시적 파싱 패턴 (비어 있으면 자유 형식 파싱)
    pub patterns: Vec<String>,
    /// 저장 전에 UTC로 변환
    pub convert_to_utc: bool,
    /// 로캘 식별자
    pub locale: String,
    /// 오프셋이 없는 입력에 적용할 고정 오프셋 (`+09:00`, `UTC` 등)
    pub timezone: Option<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            event_type: None,
            condition: None,
            field: String::new(),
            target: "@timestamp".to_owned(),
            patterns: Vec::new(),
            convert_to_utc: false,
            locale: "en-US".to_owned(),
            timezone: None,
        }
    }
}

/// Mutate 필터 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MutateConfig {
    /// 이 타입의 이벤트에만 적용
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    /// 적용 조건식
    pub condition: Option<String>,
    /// `(필드, 구분자)` 쌍
    pub split: Vec<(String, String)>,
    /// `(이전 이름, 새 이름)` 쌍
    pub rename: Vec<(String, String)>,
    /// `(필드, 값 템플릿)` 쌍
    pub replace: Vec<(String, String)>,
}

// ─── Outputs ────────────────────────────────────────────────────────

/// 출력 전송 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Redis 리스트 (`RPUSH`)
    Redis,
    /// 표준 출력
    Stdout,
}

impl OutputKind {
    /// 네트워크 전송 여부
    pub fn is_networked(self) -> bool {
        matches!(self, Self::Redis)
    }
}

/// 큐 용량 초과 시 버릴 메시지
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPolicy {
    /// 가장 오래된 메시지를 버림
    #[default]
    Oldest,
    /// 새로 들어온 메시지를 버림
    Newest,
}

/// 출력 전송기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// 출력 이름 (고유)
    pub name: String,
    /// 전송 방식
    pub kind: OutputKind,
    /// 후보 호스트 목록 (라운드 로빈)
    pub hosts: Vec<String>,
    /// 포트
    pub port: u16,
    /// 연결/작업 타임아웃 (밀리초)
    pub timeout_ms: u64,
    /// 대상 큐/인덱스 이름
    pub target: String,
    /// 플러시 주기 (밀리초)
    pub flush_interval_ms: u64,
    /// 대기 큐 용량 (없으면 무제한)
    pub queue_capacity: Option<usize>,
    /// 용량 초과 시 정책
    pub drop_policy: DropPolicy,
    /// 시작 메타데이터를 큐에 먼저 적재
    pub announce: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            name: "redis".to_owned(),
            kind: OutputKind::Redis,
            hosts: vec!["localhost".to_owned()],
            port: 6379,
            timeout_ms: 10_000,
            target: "logstash".to_owned(),
            flush_interval_ms: 1_000,
            queue_capacity: None,
            drop_policy: DropPolicy::Oldest,
            announce: false,
        }
    }
}

impl OutputConfig {
    fn validate(&self, idx: usize) -> Result<(), LogshipError> {
        if self.name.is_empty() {
            return Err(invalid(format!("outputs[{idx}].name"), "must not be empty"));
        }
        if self.kind.is_networked() {
            if self.hosts.is_empty() {
                return Err(invalid(
                    format!("outputs[{idx}].hosts"),
                    "networked outputs need at least one host",
                ));
            }
            if let Some(pos) = self.hosts.iter().position(|h| h.trim().is_empty()) {
                return Err(invalid(
                    format!("outputs[{idx}].hosts[{pos}]"),
                    "host must not be empty",
                ));
            }
            if self.port == 0 {
                return Err(invalid(format!("outputs[{idx}].port"), "must not be 0"));
            }
            if self.target.is_empty() {
                return Err(invalid(
                    format!("outputs[{idx}].target"),
                    "must not be empty",
                ));
            }
        }
        if self.timeout_ms == 0 {
            return Err(invalid(
                format!("outputs[{idx}].timeout_ms"),
                "must be greater than 0",
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(invalid(
                format!("outputs[{idx}].flush_interval_ms"),
                "must be greater than 0",
            ));
        }
        if self.queue_capacity == Some(0) {
            return Err(invalid(
                format!("outputs[{idx}].queue_capacity"),
                "must be greater than 0 when set",
            ));
        }
        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = std::any::type_name::<T>(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}
