//! Grok 필터: 패턴 기반 필드 추출
//!
//! 매치 규칙은 설정 순서대로 검사되며, 소스 필드가 존재하는 첫 규칙이
//! 그 이벤트에 대한 결과를 결정합니다. 뒤따르는 규칙은 평가되지 않습니다.
//!
//! 매치에 성공하면 모든 명명 캡처가 문자열 필드로 기록됩니다. 이름이 정확히
//! `timestamp`인 캡처는 날짜로 해석을 시도해 UTC 타임스탬프로 기록합니다.
//! 이어서 `add_field`, `remove_field`가 적용되고, `drop_if_match`면 이벤트를 버립니다.

use std::sync::Arc;

use logship_core::config::GrokConfig;
use logship_core::event::{Event, Value};

use super::date::parse_capture_timestamp;
use super::template::interpolate;
use super::{Filter, FilterGate, FilterOutcome};
use crate::error::LogPipelineError;
use crate::pattern::{CompiledPattern, PatternResolver};

/// 날짜로 해석하는 캡처 이름
pub const TIMESTAMP_CAPTURE: &str = "timestamp";

/// 해석된 매치 규칙
#[derive(Debug, Clone)]
struct GrokRule {
    field: String,
    pattern: Arc<CompiledPattern>,
}

/// Grok 필터
#[derive(Debug)]
pub struct GrokFilter {
    gate: FilterGate,
    rules: Vec<GrokRule>,
    add_field: Vec<(String, String)>,
    remove_field: Vec<String>,
    drop_if_match: bool,
}

impl GrokFilter {
    /// 설정으로 필터를 생성합니다. 모든 패턴을 미리 해석합니다.
    pub fn from_config(
        config: &GrokConfig,
        resolver: &PatternResolver,
    ) -> Result<Self, LogPipelineError> {
        let gate = FilterGate::new(config.event_type.as_deref(), config.condition.as_deref())?;
        let rules = config
            .matches
            .iter()
            .map(|rule| {
                Ok(GrokRule {
                    field: rule.field.clone(),
                    pattern: resolver.resolve(&rule.pattern)?,
                })
            })
            .collect::<Result<Vec<_>, LogPipelineError>>()?;

        Ok(Self {
            gate,
            rules,
            add_field: config.add_field.clone(),
            remove_field: config.remove_field.clone(),
            drop_if_match: config.drop_if_match,
        })
    }

    fn write_captures(event: &mut Event, captures: Vec<(String, String)>) {
        for (name, text) in captures {
            let value = if name == TIMESTAMP_CAPTURE {
                match parse_capture_timestamp(&text) {
                    Some(ts) => Value::from(ts),
                    None => Value::String(text),
                }
            } else {
                Value::String(text)
            };
            event.insert(name, value);
        }
    }

    fn apply_additions(&self, event: &mut Event) {
        for (name, value) in &self.add_field {
            let name = interpolate(name, event).into_owned();
            let value = interpolate(value, event).into_owned();
            event.insert(name, value);
        }
        for name in &self.remove_field {
            let name = interpolate(name, event).into_owned();
            event.remove(&name);
        }
    }
}

impl Filter for GrokFilter {
    fn name(&self) -> &'static str {
        "grok"
    }

    fn gate(&self) -> &FilterGate {
        &self.gate
    }

    fn apply(&self, event: &mut Event) -> FilterOutcome {
        let Some(rule) = self.rules.iter().find(|rule| event.contains(&rule.field)) else {
            return FilterOutcome::NoMatch;
        };

        let Some(text) = event.get_text(&rule.field).map(|t| t.into_owned()) else {
            return FilterOutcome::NoMatch;
        };
        if text.is_empty() {
            return FilterOutcome::NoMatch;
        }

        let Some(captures) = rule.pattern.captures(&text) else {
            tracing::trace!(field = %rule.field, pattern = rule.pattern.expression(), "grok no match");
            return FilterOutcome::NoMatch;
        };
        let captures = captures
            .into_iter()
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect();

        Self::write_captures(event, captures);
        self.apply_additions(event);

        if self.drop_if_match {
            FilterOutcome::Drop
        } else {
            FilterOutcome::Applied
        }
    }
}
