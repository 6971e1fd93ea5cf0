//! Date 필터: 날짜 파싱/정규화
//!
//! 소스 필드의 텍스트를 설정된 패턴 순서대로 해석해 첫 성공 결과를 타겟 필드에
//! 타임스탬프로 기록합니다. 패턴이 없으면 자유 형식으로 해석합니다.
//!
//! # 패턴 형식
//! - Joda/.NET 스타일: `yyyy-MM-dd HH:mm:ss`, `dd/MMM/yyyy:HH:mm:ss Z`, `'T'` 같은 인용 리터럴
//! - 키워드: `ISO8601`, `UNIX`, `UNIX_MS`
//! - Grok 표현식 (`%{` 포함): 해석된 패턴의 첫 일치 부분을 자유 형식으로 해석
//!
//! 연도가 없는 패턴(`MMM dd HH:mm:ss`)은 현재 연도를 가정합니다.
//! 오프셋이 없는 입력에는 `timezone` 설정(기본 UTC)을 적용합니다.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;

use logship_core::config::DateConfig;
use logship_core::event::{Event, Value};

use super::{Filter, FilterGate, FilterOutcome};
use crate::error::LogPipelineError;
use crate::pattern::{CompiledPattern, PatternResolver};

/// Grok `timestamp` 캡처에 대한 대체 형식 (현재 연도 가정)
const CAPTURE_FALLBACK_PATTERNS: &[&str] = &[
    "MMM dd hh:mm:ss",
    "MMM dd HH:mm:ss",
    "MMM dd h:mm",
    "MMM dd hh:mm",
];

static CAPTURE_FALLBACKS: Lazy<Vec<JodaFormat>> = Lazy::new(|| {
    CAPTURE_FALLBACK_PATTERNS
        .iter()
        .filter_map(|p| JodaFormat::compile(p).ok())
        .collect()
});

/// Grok `timestamp` 캡처 값을 UTC 타임스탬프로 해석합니다.
///
/// 자유 형식 해석을 먼저 시도하고, 실패하면 syslog 스타일 대체 형식을 시도합니다.
pub fn parse_capture_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = dateparser::parse_with_timezone(text, &Utc) {
        return Some(ts);
    }
    CAPTURE_FALLBACKS
        .iter()
        .find_map(|format| format.parse(text, utc_offset()))
        .map(|ts| ts.with_timezone(&Utc))
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// 자유 형식 날짜 해석
///
/// RFC 3339, RFC 2822, 일반적인 로그 형식 순으로 시도합니다.
pub fn parse_free_form(text: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts);
    }
    if let Ok(ts) = dateparser::parse_with_timezone(text, &default_offset) {
        return Some(ts.with_timezone(&default_offset));
    }
    CAPTURE_FALLBACKS
        .iter()
        .find_map(|format| format.parse(text, default_offset))
}

const ISO8601_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const ISO8601_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

fn parse_iso8601(text: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts);
    }
    if let Some(ts) = ISO8601_OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(text, f).ok())
    {
        return Some(ts);
    }
    ISO8601_NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .and_then(|naive| default_offset.from_local_datetime(&naive).single())
}

fn parse_unix_seconds(text: &str) -> Option<DateTime<FixedOffset>> {
    let secs = text.parse::<f64>().ok().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64).map(|ts| ts.fixed_offset())
}

fn parse_unix_millis(text: &str) -> Option<DateTime<FixedOffset>> {
    let millis = match text.parse::<i64>() {
        Ok(ms) => ms,
        Err(_) => text.parse::<f64>().ok().filter(|ms| ms.is_finite())?.round() as i64,
    };
    DateTime::from_timestamp_millis(millis).map(|ts| ts.fixed_offset())
}

/// `UTC`, `Z`, `+09:00`, `-0500`, `GMT+2` 형식의 고정 오프셋을 해석합니다.
pub fn parse_offset(spec: &str) -> Option<FixedOffset> {
    let spec = spec.trim();
    let upper = spec.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);
    if rest.is_empty() || rest == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes().first() {
        Some(b'+') => (1, &rest[1..]),
        Some(b'-') => (-1, &rest[1..]),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() > 2 => digits.split_at(digits.len() - 2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

// ─── Joda/.NET 패턴 변환 ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    Spec(&'static str),
    TwelveHour,
}

/// chrono 형식으로 변환된 Joda/.NET 스타일 날짜 패턴
#[derive(Debug, Clone)]
pub struct JodaFormat {
    format: String,
    has_year: bool,
    has_time: bool,
    has_offset: bool,
}

impl JodaFormat {
    /// 패턴을 chrono 형식 문자열로 변환합니다.
    ///
    /// 오전/오후 표시(`a`, `tt`)가 없는 12시간제 시(`h`, `hh`)는 24시간제로 해석합니다.
    pub fn compile(pattern: &str) -> Result<Self, String> {
        let mut pieces = Vec::new();
        let mut has_year = false;
        let mut has_time = false;
        let mut has_offset = false;
        let mut has_meridiem = false;

        let chars: Vec<char> = pattern.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];

            if c == '\'' {
                // '' 는 작은따옴표 리터럴
                if chars.get(i + 1) == Some(&'\'') {
                    pieces.push(Piece::Literal("'".to_owned()));
                    i += 2;
                    continue;
                }
                let mut literal = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            literal.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            literal.push(*ch);
                            i += 1;
                        }
                        None => return Err(format!("unterminated quote in '{pattern}'")),
                    }
                }
                pieces.push(Piece::Literal(literal));
                continue;
            }

            if !c.is_ascii_alphabetic() {
                pieces.push(Piece::Literal(c.to_string()));
                i += 1;
                continue;
            }

            let mut run = 1;
            while chars.get(i + run) == Some(&c) {
                run += 1;
            }
            i += run;

            let piece = match c {
                'y' => {
                    has_year = true;
                    Piece::Spec(if run == 2 { "%y" } else { "%Y" })
                }
                'M' => Piece::Spec(match run {
                    1 | 2 => "%m",
                    3 => "%b",
                    _ => "%B",
                }),
                'd' if run <= 2 => Piece::Spec("%d"),
                'd' | 'E' => Piece::Spec(if run >= 4 { "%A" } else { "%a" }),
                'H' => {
                    has_time = true;
                    Piece::Spec("%H")
                }
                'h' => {
                    has_time = true;
                    Piece::TwelveHour
                }
                'm' => {
                    has_time = true;
                    Piece::Spec("%M")
                }
                's' => Piece::Spec("%S"),
                'S' | 'f' => Piece::Spec(match run {
                    1..=3 => "%3f",
                    4..=6 => "%6f",
                    _ => "%9f",
                }),
                'a' | 't' => {
                    has_meridiem = true;
                    Piece::Spec("%p")
                }
                'Z' => {
                    has_offset = true;
                    Piece::Spec(if run == 1 { "%z" } else { "%:z" })
                }
                'X' => {
                    has_offset = true;
                    Piece::Spec(if run >= 3 { "%:z" } else { "%z" })
                }
                'K' => {
                    has_offset = true;
                    Piece::Spec("%:z")
                }
                'z' if run == 3 => {
                    has_offset = true;
                    Piece::Spec("%:z")
                }
                other => {
                    return Err(format!("unsupported pattern letter '{other}' in '{pattern}'"));
                }
            };
            pieces.push(piece);
        }

        let mut format = String::new();
        for piece in pieces {
            match piece {
                Piece::Literal(text) => format.push_str(&text.replace('%', "%%")),
                Piece::Spec(spec) => format.push_str(spec),
                Piece::TwelveHour => format.push_str(if has_meridiem { "%I" } else { "%H" }),
            }
        }

        Ok(Self {
            format,
            has_year,
            has_time,
            has_offset,
        })
    }

    /// 변환된 chrono 형식 문자열
    pub fn chrono_format(&self) -> &str {
        &self.format
    }

    /// 텍스트를 해석합니다. 오프셋이 없으면 `default_offset`을 적용합니다.
    pub fn parse(&self, text: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        let (format, input): (Cow<'_, str>, Cow<'_, str>) = if self.has_year {
            (Cow::Borrowed(&self.format), Cow::Borrowed(text))
        } else {
            (
                Cow::Owned(format!("%Y {}", self.format)),
                Cow::Owned(format!("{} {}", Utc::now().year(), text)),
            )
        };

        if self.has_offset {
            return DateTime::parse_from_str(&input, &format).ok();
        }

        let naive = if self.has_time {
            NaiveDateTime::parse_from_str(&input, &format).ok()?
        } else {
            NaiveDate::parse_from_str(&input, &format)
                .ok()?
                .and_hms_opt(0, 0, 0)?
        };
        default_offset.from_local_datetime(&naive).single()
    }
}

// ─── Filter ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum DateParser {
    Iso8601,
    Unix,
    UnixMs,
    Format(JodaFormat),
    Grok(Arc<CompiledPattern>),
}

impl DateParser {
    fn build(pattern: &str, resolver: &PatternResolver) -> Result<Self, LogPipelineError> {
        match pattern.trim() {
            "ISO8601" => Ok(Self::Iso8601),
            "UNIX" => Ok(Self::Unix),
            "UNIX_MS" => Ok(Self::UnixMs),
            p if p.contains("%{") => Ok(Self::Grok(resolver.resolve(p)?)),
            p => JodaFormat::compile(p)
                .map(Self::Format)
                .map_err(|reason| LogPipelineError::FilterConfig {
                    field: "patterns".to_owned(),
                    reason,
                }),
        }
    }

    fn parse(&self, text: &str, default_offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Iso8601 => parse_iso8601(text, default_offset),
            Self::Unix => parse_unix_seconds(text),
            Self::UnixMs => parse_unix_millis(text),
            Self::Format(format) => format.parse(text, default_offset),
            Self::Grok(pattern) => pattern
                .find(text)
                .and_then(|matched| parse_free_form(matched, default_offset)),
        }
    }
}

fn is_english_locale(locale: &str) -> bool {
    let lower = locale.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower == "invariant"
        || lower == "en"
        || lower.starts_with("en-")
        || lower.starts_with("en_")
}

/// Date 필터
#[derive(Debug)]
pub struct DateFilter {
    gate: FilterGate,
    field: String,
    target: String,
    parsers: Vec<DateParser>,
    convert_to_utc: bool,
    default_offset: FixedOffset,
}

impl DateFilter {
    /// 설정으로 필터를 생성합니다. `index`는 에러 메시지의 설정 경로에 쓰입니다.
    pub fn from_config(
        config: &DateConfig,
        resolver: &PatternResolver,
        index: usize,
    ) -> Result<Self, LogPipelineError> {
        let gate = FilterGate::new(config.event_type.as_deref(), config.condition.as_deref())?;

        let default_offset = match config.timezone.as_deref() {
            None => utc_offset(),
            Some(tz) => parse_offset(tz).ok_or_else(|| LogPipelineError::FilterConfig {
                field: format!("filters[{index}].timezone"),
                reason: format!("'{tz}' is not a fixed UTC offset"),
            })?,
        };

        let parsers = config
            .patterns
            .iter()
            .enumerate()
            .map(|(pattern_idx, pattern)| {
                DateParser::build(pattern, resolver).map_err(|err| match err {
                    LogPipelineError::FilterConfig { reason, .. } => LogPipelineError::FilterConfig {
                        field: format!("filters[{index}].patterns[{pattern_idx}]"),
                        reason,
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !is_english_locale(&config.locale) {
            tracing::warn!(
                locale = %config.locale,
                field = %config.field,
                "only English month and day names are supported, locale ignored"
            );
        }

        Ok(Self {
            gate,
            field: config.field.clone(),
            target: config.target.clone(),
            parsers,
            convert_to_utc: config.convert_to_utc,
            default_offset,
        })
    }

    fn parse(&self, text: &str) -> Option<DateTime<FixedOffset>> {
        if self.parsers.is_empty() {
            return parse_free_form(text, self.default_offset);
        }
        self.parsers
            .iter()
            .find_map(|parser| parser.parse(text, self.default_offset))
    }
}

impl Filter for DateFilter {
    fn name(&self) -> &'static str {
        "date"
    }

    fn gate(&self) -> &FilterGate {
        &self.gate
    }

    fn apply(&self, event: &mut Event) -> FilterOutcome {
        let Some(value) = event.get(&self.field) else {
            return FilterOutcome::Failed;
        };

        let parsed = match value {
            Value::Timestamp(ts) => Some(*ts),
            other => {
                let text = other.to_text();
                let text = text.trim();
                if text.is_empty() {
                    return FilterOutcome::Failed;
                }
                let parsed = self.parse(text);
                if parsed.is_none() {
                    tracing::debug!(field = %self.field, value = text, "date parse failed");
                }
                parsed
            }
        };

        let Some(mut ts) = parsed else {
            return FilterOutcome::Failed;
        };
        if self.convert_to_utc {
            ts = ts.with_timezone(&Utc).fixed_offset();
        }
        event.insert(self.target.clone(), Value::Timestamp(ts));
        FilterOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    fn date_filter(patterns: &[&str], configure: impl FnOnce(&mut DateConfig)) -> DateFilter {
        let mut config = DateConfig {
            field: "logdate".to_owned(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        };
        configure(&mut config);
        DateFilter::from_config(&config, &PatternResolver::new(), 0).unwrap()
    }

    fn event_with(text: &str) -> Event {
        let mut event = Event::new();
        event.insert("logdate", text);
        event
    }

    fn stored(event: &Event) -> DateTime<FixedOffset> {
        *event
            .get("@timestamp")
            .and_then(Value::as_timestamp)
            .expect("timestamp written")
    }

    #[test]
    fn joda_conversion() {
        let cases = [
            ("yyyy-MM-dd HH:mm:ss", "%Y-%m-%d %H:%M:%S"),
            ("dd/MMM/yyyy:HH:mm:ss Z", "%d/%b/%Y:%H:%M:%S %z"),
            ("yyyy-MM-dd'T'HH:mm:ss.SSSZZ", "%Y-%m-%dT%H:%M:%S.%3f%:z"),
            ("EEE, dd MMMM yy", "%a, %d %B %y"),
            ("MM/dd/yyyy hh:mm tt", "%m/%d/%Y %I:%M %p"),
            ("MMM dd h:mm", "%b %d %H:%M"),
            ("'100%' yyyy", "100%% %Y"),
            ("HH 'o''clock'", "%H o'clock"),
        ];
        for (joda, chrono_fmt) in cases {
            let compiled = JodaFormat::compile(joda).unwrap();
            assert_eq!(compiled.chrono_format(), chrono_fmt, "{joda}");
        }
    }

    #[test]
    fn joda_rejects_unknown_letters() {
        assert!(JodaFormat::compile("yyyy-QQ").is_err());
        assert!(JodaFormat::compile("'open").is_err());
    }

    #[test]
    fn explicit_pattern_round_trip() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss"], |_| {});
        let mut event = event_with("2015-08-01 10:00:00");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
        let expected = Utc.with_ymd_and_hms(2015, 8, 1, 10, 0, 0).unwrap();
        assert_eq!(stored(&event), expected);
    }

    #[test]
    fn convert_to_utc_keeps_utc_instant() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss"], |c| c.convert_to_utc = true);
        let mut event = event_with("2015-08-01 10:00:00");
        filter.process(&mut event);
        let ts = stored(&event);
        assert_eq!(ts, Utc.with_ymd_and_hms(2015, 8, 1, 10, 0, 0).unwrap());
        assert_eq!(ts.offset().local_minus_utc(), 0);
    }

    #[test]
    fn timezone_applies_to_naive_input() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss"], |c| {
            c.timezone = Some("+09:00".to_owned());
            c.convert_to_utc = true;
        });
        let mut event = event_with("2015-08-01 10:00:00");
        filter.process(&mut event);
        let ts = stored(&event);
        assert_eq!(ts.hour(), 1);
        assert_eq!(ts.offset().local_minus_utc(), 0);
    }

    #[test]
    fn offset_in_input_is_preserved_without_conversion() {
        let filter = date_filter(&["ISO8601"], |_| {});
        let mut event = event_with("2015-08-01T10:00:00+02:00");
        filter.process(&mut event);
        let ts = stored(&event);
        assert_eq!(ts.offset().local_minus_utc(), 7200);
        assert_eq!(ts, Utc.with_ymd_and_hms(2015, 8, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn apache_pattern_with_offset() {
        let filter = date_filter(&["dd/MMM/yyyy:HH:mm:ss Z"], |c| c.convert_to_utc = true);
        let mut event = event_with("01/Aug/2015:10:00:00 -0500");
        filter.process(&mut event);
        assert_eq!(stored(&event), Utc.with_ymd_and_hms(2015, 8, 1, 15, 0, 0).unwrap());
    }

    #[test]
    fn twelve_hour_with_meridiem() {
        let filter = date_filter(&["MM/dd/yyyy hh:mm:ss a"], |_| {});
        let mut event = event_with("08/01/2015 10:30:00 PM");
        filter.process(&mut event);
        assert_eq!(stored(&event).hour(), 22);
    }

    #[test]
    fn pattern_without_year_assumes_current_year() {
        let filter = date_filter(&["MMM dd HH:mm:ss"], |_| {});
        let mut event = event_with("Aug 01 10:00:00");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
        let ts = stored(&event);
        assert_eq!(ts.year(), Utc::now().year());
        assert_eq!((ts.month(), ts.day(), ts.hour()), (8, 1, 10));
    }

    #[test]
    fn patterns_tried_in_order() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss", "dd.MM.yyyy"], |_| {});
        let mut event = event_with("27.01.2025");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
        assert_eq!(stored(&event), Utc.with_ymd_and_hms(2025, 1, 27, 0, 0, 0).unwrap());
    }

    #[test]
    fn unix_keywords() {
        let filter = date_filter(&["UNIX"], |_| {});
        let mut event = event_with("1438423200");
        filter.process(&mut event);
        assert_eq!(stored(&event), Utc.with_ymd_and_hms(2015, 8, 1, 10, 0, 0).unwrap());

        let filter = date_filter(&["UNIX_MS"], |_| {});
        let mut event = event_with("1438423200500");
        filter.process(&mut event);
        assert_eq!(stored(&event).timestamp_subsec_millis(), 500);
    }

    #[test]
    fn grok_pattern_extracts_then_parses() {
        let filter = date_filter(&["%{TIMESTAMP_ISO8601}"], |_| {});
        let mut event = event_with("started at 2015-08-01T10:00:00Z by init");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
        assert_eq!(stored(&event), Utc.with_ymd_and_hms(2015, 8, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn free_form_without_patterns() {
        let filter = date_filter(&[], |_| {});
        let mut event = event_with("2015-08-01T10:00:00+00:00");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
        assert_eq!(stored(&event), Utc.with_ymd_and_hms(2015, 8, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn unparsable_leaves_event_unchanged() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss"], |_| {});
        let mut event = event_with("not a date");
        assert_eq!(filter.process(&mut event), FilterOutcome::Failed);
        assert!(!event.contains("@timestamp"));
        assert_eq!(event.len(), 1);
    }

    #[test]
    fn absent_field_fails() {
        let filter = date_filter(&["ISO8601"], |_| {});
        let mut event = Event::new();
        assert_eq!(filter.process(&mut event), FilterOutcome::Failed);
        assert!(event.is_empty());
    }

    #[test]
    fn overwrites_existing_target() {
        let filter = date_filter(&["ISO8601"], |c| c.target = "when".to_owned());
        let mut event = event_with("2015-08-01T10:00:00Z");
        event.insert("when", "old");
        filter.process(&mut event);
        assert!(event.get("when").and_then(Value::as_timestamp).is_some());
    }

    #[test]
    fn timestamp_source_is_used_directly() {
        let filter = date_filter(&["yyyy"], |c| c.convert_to_utc = true);
        let original = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2015, 8, 1, 11, 0, 0)
            .unwrap();
        let mut event = Event::new();
        event.insert("logdate", original);
        filter.process(&mut event);
        assert_eq!(stored(&event), original);
        assert_eq!(stored(&event).offset().local_minus_utc(), 0);
    }

    #[test]
    fn config_errors_carry_paths() {
        let bad_pattern = DateConfig {
            field: "d".to_owned(),
            patterns: vec!["ISO8601".to_owned(), "yyyy-QQ".to_owned()],
            ..Default::default()
        };
        match DateFilter::from_config(&bad_pattern, &PatternResolver::new(), 3) {
            Err(LogPipelineError::FilterConfig { field, .. }) => {
                assert_eq!(field, "filters[3].patterns[1]");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let bad_tz = DateConfig {
            field: "d".to_owned(),
            timezone: Some("Mars/Olympus".to_owned()),
            ..Default::default()
        };
        match DateFilter::from_config(&bad_tz, &PatternResolver::new(), 1) {
            Err(LogPipelineError::FilterConfig { field, .. }) => {
                assert_eq!(field, "filters[1].timezone");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn non_english_locale_is_accepted() {
        let filter = date_filter(&["yyyy-MM-dd HH:mm:ss"], |c| c.locale = "de-DE".to_owned());
        let mut event = event_with("2015-08-01 10:00:00");
        assert_eq!(filter.process(&mut event), FilterOutcome::Applied);
    }

    #[test]
    fn offset_parsing() {
        assert_eq!(parse_offset("UTC").map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(parse_offset("z").map(|o| o.local_minus_utc()), Some(0));
        assert_eq!(parse_offset("+09:00").map(|o| o.local_minus_utc()), Some(32400));
        assert_eq!(parse_offset("-0530").map(|o| o.local_minus_utc()), Some(-19800));
        assert_eq!(parse_offset("GMT+2").map(|o| o.local_minus_utc()), Some(7200));
        assert!(parse_offset("Asia/Seoul").is_none());
        assert!(parse_offset("+25:00").is_none());
        assert!(parse_offset("+é1").is_none());
        assert!(parse_offset("-０９００").is_none());
    }

    #[test]
    fn non_ascii_timezone_is_config_error() {
        let config = DateConfig {
            field: "logdate".to_owned(),
            timezone: Some("+é1".to_owned()),
            ..Default::default()
        };
        let err = DateFilter::from_config(&config, &PatternResolver::new(), 3)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            LogPipelineError::FilterConfig { ref field, .. } if field == "filters[3].timezone"
        ));
    }

    #[test]
    fn capture_timestamp_fallbacks() {
        let ts = parse_capture_timestamp("Aug 01 10:00").unwrap();
        assert_eq!((ts.month(), ts.day(), ts.hour(), ts.minute()), (8, 1, 10, 0));
        assert!(parse_capture_timestamp("gibberish").is_none());
    }
}
