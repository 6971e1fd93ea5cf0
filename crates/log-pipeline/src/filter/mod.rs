//! 필터 체인
//!
//! 모든 이벤트는 설정 순서대로 [`Filter`]를 차례로 통과합니다.
//! 필터는 이벤트를 제자리에서 변경하며, [`FilterOutcome::Drop`]을 돌려주면
//! 체인은 즉시 중단되고 이벤트는 버려집니다.
//!
//! # 구성 요소
//! - [`FilterGate`]: `type`/`condition` 공통 적용 조건
//! - [`GrokFilter`]: 패턴 추출
//! - [`DateFilter`]: 날짜 파싱/정규화
//! - [`MutateFilter`]: split → rename → replace
//! - [`FilterChain`]: 순서 있는 필터 목록
//!
//! 체인은 구성 후 불변이므로 `Arc`로 여러 출력 송신기가 공유합니다.

pub mod condition;
pub mod date;
pub mod grok;
pub mod mutate;
pub mod template;

use std::fmt;

use logship_core::config::FilterConfig;
use logship_core::event::Event;

use crate::error::LogPipelineError;
use crate::pattern::PatternResolver;

pub use condition::Condition;
pub use date::DateFilter;
pub use grok::GrokFilter;
pub use mutate::MutateFilter;

/// 필터 한 번 적용의 결과
///
/// `Drop` 외의 결과는 모두 체인을 계속 진행시킵니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    /// 필터가 이벤트를 변경함
    Applied,
    /// 게이트(`type`/`condition`)에 걸려 적용되지 않음
    Skipped,
    /// 소스 필드가 없거나 패턴이 일치하지 않음
    NoMatch,
    /// 소스 필드가 없거나 값을 해석하지 못함 (진단 목적)
    Failed,
    /// 이벤트를 버려야 함
    Drop,
}

impl fmt::Display for FilterOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::NoMatch => "no_match",
            Self::Failed => "failed",
            Self::Drop => "drop",
        };
        f.write_str(s)
    }
}

/// 체인 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainResult {
    /// 이벤트를 전달
    Keep,
    /// 이벤트를 버림
    Drop,
}

/// 필터 공통 적용 조건
///
/// `type`은 이벤트의 `type` 필드와 대소문자를 구분해 비교합니다.
/// `type` 필드가 없는 이벤트는 타입 검사를 통과합니다.
#[derive(Debug, Clone, Default)]
pub struct FilterGate {
    event_type: Option<String>,
    condition: Option<Condition>,
}

impl FilterGate {
    /// 항상 통과하는 게이트
    pub fn open() -> Self {
        Self::default()
    }

    /// 설정 값으로 게이트를 만듭니다. 조건식은 여기서 파싱됩니다.
    pub fn new(
        event_type: Option<&str>,
        condition: Option<&str>,
    ) -> Result<Self, LogPipelineError> {
        let condition = condition
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(Condition::parse)
            .transpose()?;
        Ok(Self {
            event_type: event_type.map(str::to_owned),
            condition,
        })
    }

    /// 이벤트가 게이트를 통과하는지 확인합니다.
    pub fn admits(&self, event: &Event) -> bool {
        if let Some(expected) = &self.event_type
            && let Some(actual) = event.event_type()
            && actual != expected
        {
            return false;
        }
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(event))
    }
}

/// 이벤트 변환 단위
///
/// 구현체는 불변 상태만 가지므로 여러 스레드에서 동시에 호출될 수 있습니다.
pub trait Filter: Send + Sync {
    /// 필터 종류 이름
    fn name(&self) -> &'static str;

    /// 공통 적용 조건
    fn gate(&self) -> &FilterGate;

    /// 게이트를 통과한 이벤트에 변환을 적용합니다.
    fn apply(&self, event: &mut Event) -> FilterOutcome;

    /// 게이트를 검사한 뒤 변환을 적용합니다.
    fn process(&self, event: &mut Event) -> FilterOutcome {
        if self.gate().admits(event) {
            self.apply(event)
        } else {
            FilterOutcome::Skipped
        }
    }
}

/// 순서 있는 필터 목록
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// 빈 체인을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필터 설정 목록으로 체인을 구성합니다.
    ///
    /// 모든 패턴과 조건식은 이 시점에 해석됩니다. 하나라도 실패하면
    /// 체인 전체가 구성되지 않습니다.
    pub fn from_configs(
        configs: &[FilterConfig],
        resolver: &PatternResolver,
    ) -> Result<Self, LogPipelineError> {
        let mut chain = Self::new();
        for (idx, config) in configs.iter().enumerate() {
            let filter: Box<dyn Filter> = match config {
                FilterConfig::Grok(c) => Box::new(GrokFilter::from_config(c, resolver)?),
                FilterConfig::Date(c) => Box::new(DateFilter::from_config(c, resolver, idx)?),
                FilterConfig::Mutate(c) => Box::new(MutateFilter::from_config(c)?),
            };
            chain.push(filter);
        }
        tracing::debug!(filters = chain.len(), "filter chain built");
        Ok(chain)
    }

    /// 체인 끝에 필터를 추가합니다.
    pub fn push(&mut self, filter: Box<dyn Filter>) {
        self.filters.push(filter);
    }

    /// 필터 수
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// 필터가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// 필터 이름 목록 (설정 순서)
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// 이벤트에 모든 필터를 순서대로 적용합니다.
    pub fn run(&self, event: &mut Event) -> ChainResult {
        for (idx, filter) in self.filters.iter().enumerate() {
            let outcome = filter.process(event);
            tracing::trace!(filter = filter.name(), index = idx, %outcome, "filter applied");
            if outcome == FilterOutcome::Drop {
                tracing::debug!(filter = filter.name(), index = idx, "event dropped by filter");
                return ChainResult::Drop;
            }
        }
        ChainResult::Keep
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .finish()
    }
}
