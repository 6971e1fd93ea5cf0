//! Grok 패턴 해석기
//!
//! `%{NAME}` / `%{NAME:field}` 자리표시자를 라이브러리 정의로 재귀 치환해
//! 하나의 명명 캡처 정규식으로 컴파일합니다.
//!
//! # 캡처 규칙
//! - 최상위 `%{NAME}`은 `NAME`으로, `%{NAME:field}`는 `field`로 캡처합니다.
//! - 정의 안의 `%{NAME}`은 캡처하지 않고, `%{NAME:field}`는 깊이와 무관하게 캡처합니다.
//! - 표현식에 직접 쓴 `(?<x>...)` / `(?P<x>...)` 그룹도 `x`로 캡처합니다.
//!
//! 캡처 그룹은 내부적으로 `_g0`, `_g1`, ... 이름으로 컴파일되고 필드명으로 되돌려
//! 매핑됩니다. 따라서 필드명에 `@`, `-`, `.` 같은 문자를 쓸 수 있고 같은 필드명이
//! 여러 번 나와도 됩니다.
//!
//! # 사용 예시
//! ```
//! use logship_pipeline::pattern::PatternResolver;
//!
//! let resolver = PatternResolver::new();
//! let pattern = resolver.resolve("status=%{INT:status}").unwrap();
//! let captures = pattern.captures("status=200").unwrap();
//! assert_eq!(captures, vec![("status", "200")]);
//! ```

pub mod library;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use regex::Regex;

use crate::error::LogPipelineError;

/// 참조 중첩 최대 깊이 (순환 정의 감지)
pub const MAX_REFERENCE_DEPTH: usize = 32;

/// 컴파일된 Grok 패턴
#[derive(Debug)]
pub struct CompiledPattern {
    expression: String,
    regex: Regex,
    /// (내부 그룹명, 필드명)
    fields: Vec<(String, String)>,
}

impl CompiledPattern {
    /// 원래 표현식
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 확장 후 컴파일된 정규식
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 캡처 필드명을 패턴 내 순서대로 반환합니다.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, field)| field.as_str())
    }

    /// 매치 여부
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// 첫 매치 전체 문자열
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }

    /// 첫 매치에서 실제로 참여한 캡처를 `(필드명, 값)`으로 반환합니다.
    ///
    /// 매치하지 않으면 `None`입니다.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Vec<(&str, &'t str)>> {
        let caps = self.regex.captures(text)?;
        Some(
            self.fields
                .iter()
                .filter_map(|(group, field)| {
                    caps.name(group).map(|m| (field.as_str(), m.as_str()))
                })
                .collect(),
        )
    }
}

/// 패턴 해석기
///
/// 해석 결과는 원래 표현식을 키로 캐시되어 같은 표현식은 같은 `Arc`를 돌려받습니다.
#[derive(Debug, Default)]
pub struct PatternResolver {
    custom: HashMap<String, String>,
    cache: Mutex<HashMap<String, Arc<CompiledPattern>>>,
}

impl PatternResolver {
    /// 내장 라이브러리만 사용하는 해석기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 사용자 정의 패턴을 추가한 해석기를 생성합니다.
    pub fn with_patterns<I, K, V>(patterns: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut resolver = Self::new();
        for (name, definition) in patterns {
            resolver.add_pattern(name, definition);
        }
        resolver
    }

    /// 사용자 정의 패턴을 추가합니다. 같은 이름의 내장 패턴보다 우선합니다.
    pub fn add_pattern(&mut self, name: impl Into<String>, definition: impl Into<String>) {
        self.custom.insert(name.into(), definition.into());
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// 캐시된 패턴 수
    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// 표현식을 해석해 컴파일된 패턴을 반환합니다.
    ///
    /// # Errors
    /// - 알 수 없는 하위 패턴 참조: [`LogPipelineError::UnknownPattern`]
    /// - 잘못된 참조 문법, 너무 깊은 중첩: [`LogPipelineError::Pattern`]
    /// - 확장 결과가 올바른 정규식이 아님: [`LogPipelineError::Pattern`]
    pub fn resolve(&self, expression: &str) -> Result<Arc<CompiledPattern>, LogPipelineError> {
        if let Some(hit) = self.lock_cache().get(expression) {
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(self.compile(expression)?);
        let mut cache = self.lock_cache();
        let entry = cache
            .entry(expression.to_owned())
            .or_insert_with(|| Arc::clone(&compiled));
        Ok(Arc::clone(entry))
    }

    /// 표현식을 정규식 문자열로 확장합니다 (컴파일하지 않음).
    pub fn expand(&self, expression: &str) -> Result<String, LogPipelineError> {
        let mut state = ExpandState::new(expression);
        self.expand_into(expression, 0, true, &mut state)
    }

    fn compile(&self, expression: &str) -> Result<CompiledPattern, LogPipelineError> {
        let mut state = ExpandState::new(expression);
        let source = self.expand_into(expression, 0, true, &mut state)?;
        let regex = Regex::new(&source).map_err(|e| LogPipelineError::Pattern {
            expression: expression.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(CompiledPattern {
            expression: expression.to_owned(),
            regex,
            fields: state.fields,
        })
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<CompiledPattern>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn definition(&self, name: &str) -> Option<&str> {
        self.custom
            .get(name)
            .map(String::as_str)
            .or_else(|| library::builtin(name))
    }

    fn expand_into(
        &self,
        text: &str,
        depth: usize,
        top_level: bool,
        state: &mut ExpandState<'_>,
    ) -> Result<String, LogPipelineError> {
        if depth > MAX_REFERENCE_DEPTH {
            return Err(state.error(format!(
                "reference nesting exceeds {MAX_REFERENCE_DEPTH} levels (cyclic definition?)"
            )));
        }

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut literal_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    let escaped = text[i + 1..].chars().next().map_or(0, char::len_utf8);
                    i += 1 + escaped;
                }
                b'%' if bytes.get(i + 1) == Some(&b'{') => {
                    let body_start = i + 2;
                    let close = text[body_start..]
                        .find('}')
                        .ok_or_else(|| state.error("unterminated '%{' reference"))?;
                    out.push_str(&text[literal_start..i]);
                    let reference = &text[body_start..body_start + close];
                    let group = self.expand_reference(reference, depth, top_level, state)?;
                    out.push_str(&group);
                    i = body_start + close + 1;
                    literal_start = i;
                }
                b'(' => match raw_group_name_start(&text[i..]) {
                    Some(offset) => {
                        let name_start = i + offset;
                        let close = text[name_start..]
                            .find('>')
                            .ok_or_else(|| state.error("unterminated named group"))?;
                        let field = &text[name_start..name_start + close];
                        if field.is_empty() {
                            return Err(state.error("named group without a name"));
                        }
                        out.push_str(&text[literal_start..i]);
                        let group = state.push_field(field);
                        out.push_str("(?P<");
                        out.push_str(&group);
                        out.push('>');
                        i = name_start + close + 1;
                        literal_start = i;
                    }
                    None => i += 1,
                },
                _ => i += 1,
            }
        }
        out.push_str(&text[literal_start..]);
        Ok(out)
    }

    fn expand_reference(
        &self,
        reference: &str,
        depth: usize,
        top_level: bool,
        state: &mut ExpandState<'_>,
    ) -> Result<String, LogPipelineError> {
        let mut parts = reference.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let field = parts.next();
        if parts.next().is_some() {
            return Err(state.error(format!(
                "'%{{{reference}}}': type conversion suffixes are not supported"
            )));
        }
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(state.error(format!("invalid pattern name in '%{{{reference}}}'")));
        }
        if field == Some("") {
            return Err(state.error(format!("empty field name in '%{{{reference}}}'")));
        }

        let definition = self
            .definition(name)
            .ok_or_else(|| LogPipelineError::UnknownPattern {
                name: name.to_owned(),
                expression: state.expression.to_owned(),
            })?;

        let capture = match field {
            Some(field) => Some(field),
            None if top_level => Some(name),
            None => None,
        };

        // 캡처 그룹 번호는 여는 괄호 순서를 따르도록 본문 확장 전에 예약합니다.
        let group = capture.map(|field| state.push_field(field));
        let body = self.expand_into(definition, depth + 1, false, state)?;

        Ok(match group {
            Some(group) => format!("(?P<{group}>{body})"),
            None => format!("(?:{body})"),
        })
    }
}

/// `(?P<name>` 또는 `(?<name>`이면 이름 시작 오프셋을 반환합니다.
fn raw_group_name_start(text: &str) -> Option<usize> {
    if text.starts_with("(?P<") {
        Some(4)
    } else if text.starts_with("(?<") && !text[3..].starts_with(['=', '!']) {
        Some(3)
    } else {
        None
    }
}

struct ExpandState<'e> {
    expression: &'e str,
    fields: Vec<(String, String)>,
}

impl<'e> ExpandState<'e> {
    fn new(expression: &'e str) -> Self {
        Self {
            expression,
            fields: Vec::new(),
        }
    }

    fn push_field(&mut self, field: &str) -> String {
        let group = format!("_g{}", self.fields.len());
        self.fields.push((group.clone(), field.to_owned()));
        group
    }

    fn error(&self, reason: impl Into<String>) -> LogPipelineError {
        LogPipelineError::Pattern {
            expression: self.expression.to_owned(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn int_captures_under_pattern_name() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve("%{INT}").unwrap();
        assert_eq!(pattern.captures("42"), Some(vec![("INT", "42")]));
    }

    #[test]
    fn explicit_field_name_is_used() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve("status=%{INT:status}").unwrap();
        assert_eq!(pattern.captures("status=200"), Some(vec![("status", "200")]));
        assert!(pattern.captures("status=ok").is_none());
    }

    #[test]
    fn nested_references_without_field_do_not_capture() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve("%{TIMESTAMP_ISO8601:ts}").unwrap();
        let names: Vec<_> = pattern.field_names().collect();
        assert_eq!(names, vec!["ts"]);
        let caps = pattern.captures("at 2015-08-01T10:00:00Z done").unwrap();
        assert_eq!(caps, vec![("ts", "2015-08-01T10:00:00Z")]);
    }

    #[test]
    fn nested_named_references_capture() {
        let resolver = PatternResolver::new();
        let pattern = resolver
            .resolve("%{SYSLOGBASE} %{GREEDYDATA:msg}")
            .unwrap();
        let caps = pattern
            .captures("Aug  1 10:00:00 web-01 sshd[1234]: Accepted password")
            .unwrap();
        let lookup = |name: &str| caps.iter().find(|(f, _)| *f == name).map(|(_, v)| *v);
        assert_eq!(lookup("timestamp"), Some("Aug  1 10:00:00"));
        assert_eq!(lookup("logsource"), Some("web-01"));
        assert_eq!(lookup("program"), Some("sshd"));
        assert_eq!(lookup("pid"), Some("1234"));
        assert_eq!(lookup("msg"), Some("Accepted password"));
        assert!(lookup("SYSLOGBASE").is_some());
    }

    #[test]
    fn unparticipating_optional_groups_are_omitted() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve("%{SYSLOGPROG}").unwrap();
        let caps = pattern.captures("cron").unwrap();
        assert!(caps.iter().all(|(field, _)| *field != "pid"));
    }

    #[test]
    fn field_names_may_use_any_characters() {
        let resolver = PatternResolver::new();
        let pattern = resolver
            .resolve("%{IPV4:client.ip} %{WORD:@verb}")
            .unwrap();
        let caps = pattern.captures("10.0.0.1 GET").unwrap();
        assert_eq!(caps, vec![("client.ip", "10.0.0.1"), ("@verb", "GET")]);
    }

    #[test]
    fn raw_named_groups_are_captures() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve(r"(?<user>\w+)@(?P<domain>[a-z.]+)").unwrap();
        let caps = pattern.captures("alice@example.org").unwrap();
        assert_eq!(caps, vec![("user", "alice"), ("domain", "example.org")]);
    }

    #[test]
    fn unknown_pattern_fails() {
        let resolver = PatternResolver::new();
        let err = resolver.resolve("%{NOPE:x}").unwrap_err();
        assert!(matches!(err, LogPipelineError::UnknownPattern { ref name, .. } if name == "NOPE"));
    }

    #[test]
    fn invalid_regex_fails() {
        let resolver = PatternResolver::new();
        let err = resolver.resolve("status=(%{INT}").unwrap_err();
        assert!(matches!(err, LogPipelineError::Pattern { .. }));
    }

    #[test]
    fn unterminated_reference_fails() {
        let resolver = PatternResolver::new();
        assert!(matches!(
            resolver.resolve("%{INT"),
            Err(LogPipelineError::Pattern { .. })
        ));
    }

    #[test]
    fn cyclic_definitions_are_detected() {
        let resolver = PatternResolver::with_patterns([("A", "%{B}"), ("B", "%{A}")]);
        let err = resolver.resolve("%{A}").unwrap_err();
        assert!(err.to_string().contains("nesting"), "{err}");
    }

    #[test]
    fn custom_patterns_override_builtins() {
        let resolver = PatternResolver::with_patterns([("INT", "[0-9]{3}")]);
        let pattern = resolver.resolve("^%{INT:code}$").unwrap();
        assert!(pattern.is_match("404"));
        assert!(!pattern.is_match("4040"));
    }

    #[test]
    fn custom_pattern_can_reference_builtins() {
        let resolver = PatternResolver::with_patterns([("STATUS", "status=%{INT:status}")]);
        let pattern = resolver.resolve("%{STATUS}").unwrap();
        let caps = pattern.captures("status=503").unwrap();
        assert!(caps.contains(&("status", "503")));
    }

    #[test]
    fn resolution_is_cached() {
        let resolver = PatternResolver::new();
        let first = resolver.resolve("%{WORD:w}").unwrap();
        let second = resolver.resolve("%{WORD:w}").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_len(), 1);
    }

    #[test]
    fn escaped_percent_is_literal() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve(r"100\% %{INT:n}").unwrap();
        assert_eq!(pattern.captures("100% 7"), Some(vec![("n", "7")]));
    }

    #[test]
    fn combined_apache_log_resolves() {
        let resolver = PatternResolver::new();
        let pattern = resolver.resolve("%{COMBINEDAPACHELOG}").unwrap();
        let line = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08""#;
        let caps = pattern.captures(line).unwrap();
        let lookup = |name: &str| caps.iter().find(|(f, _)| *f == name).map(|(_, v)| *v);
        assert_eq!(lookup("clientip"), Some("127.0.0.1"));
        assert_eq!(lookup("auth"), Some("frank"));
        assert_eq!(lookup("verb"), Some("GET"));
        assert_eq!(lookup("response"), Some("200"));
        assert_eq!(lookup("bytes"), Some("2326"));
    }

    #[test]
    fn every_builtin_pattern_compiles() {
        let resolver = PatternResolver::new();
        for name in library::builtin_names() {
            resolver
                .resolve(&format!("%{{{name}}}"))
                .unwrap_or_else(|e| panic!("{name} failed to compile: {e}"));
        }
    }

    proptest! {
        #[test]
        fn expansion_is_deterministic(n in 0usize..6) {
            let names = ["INT", "WORD", "IPORHOST", "SYSLOGBASE", "URI", "DATESTAMP"];
            let expr = format!("x %{{{}:f}} y", names[n]);
            let a = PatternResolver::new().expand(&expr).unwrap();
            let b = PatternResolver::new().expand(&expr).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn int_pattern_captures_any_integer(value in any::<i64>()) {
            let resolver = PatternResolver::new();
            let pattern = resolver.resolve("^%{INT}$").unwrap();
            let text = value.to_string();
            let caps = pattern.captures(&text).unwrap();
            prop_assert_eq!(caps, vec![("INT", text.as_str())]);
        }
    }
}
