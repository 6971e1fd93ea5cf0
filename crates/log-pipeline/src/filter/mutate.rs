//! Mutate 필터: 필드 변경
//!
//! 적용 순서는 항상 split → rename → replace 입니다.
//! rename의 두 이름과 replace의 값은 적용 시점에 `%{field}` 치환됩니다.

use logship_core::config::MutateConfig;
use logship_core::event::{Event, Value};

use super::template::interpolate;
use super::{Filter, FilterGate, FilterOutcome};
use crate::error::LogPipelineError;

/// Mutate 필터
#[derive(Debug)]
pub struct MutateFilter {
    gate: FilterGate,
    split: Vec<(String, String)>,
    rename: Vec<(String, String)>,
    replace: Vec<(String, String)>,
}

impl MutateFilter {
    /// 설정으로 필터를 생성합니다.
    pub fn from_config(config: &MutateConfig) -> Result<Self, LogPipelineError> {
        Ok(Self {
            gate: FilterGate::new(config.event_type.as_deref(), config.condition.as_deref())?,
            split: config.split.clone(),
            rename: config.rename.clone(),
            replace: config.replace.clone(),
        })
    }

    fn apply_splits(&self, event: &mut Event) {
        for (field, delimiter) in &self.split {
            let Some(value) = event.get(field) else {
                continue;
            };
            // 이미 배열이면 다시 나누지 않습니다.
            if value.as_array().is_some() {
                continue;
            }
            let parts: Vec<Value> = value
                .to_text()
                .split(delimiter.as_str())
                .map(Value::from)
                .collect();
            event.insert(field.clone(), parts);
        }
    }

    fn apply_renames(&self, event: &mut Event) {
        for (old_name, new_name) in &self.rename {
            let old_name = interpolate(old_name, event).into_owned();
            let new_name = interpolate(new_name, event).into_owned();
            event.rename(&old_name, &new_name);
        }
    }

    fn apply_replacements(&self, event: &mut Event) {
        for (field, template) in &self.replace {
            let value = interpolate(template, event).into_owned();
            event.insert(field.clone(), value);
        }
    }
}

impl Filter for MutateFilter {
    fn name(&self) -> &'static str {
        "mutate"
    }

    fn gate(&self) -> &FilterGate {
        &self.gate
    }

    fn apply(&self, event: &mut Event) -> FilterOutcome {
        self.apply_splits(event);
        self.apply_renames(event);
        self.apply_replacements(event);
        FilterOutcome::Applied
    }
}
