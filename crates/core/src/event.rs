//! 이벤트 모델: 파이프라인을 흐르는 로그 레코드
//!
//! [`Event`]는 필드 이름에서 [`Value`]로의 순서 보존 매핑입니다.
//! 필드 조회는 대소문자를 구분하지 않으며, 같은 이름(대소문자 무시)의 필드는
//! 하나만 존재합니다. 삽입 순서는 직렬화 결과를 결정적으로 만들기 위해 유지됩니다.
//!
//! # 수명
//! 리스너가 수집 시점에 생성하고, 이를 처리하는 출력 전송기 호출 하나가
//! 배타적으로 소유합니다. 필터 체인은 `&mut Event`로 제자리 변경합니다.
//!
//! # 사용 예시
//! ```
//! use logship_core::event::{Event, Value};
//!
//! let mut event = Event::new();
//! event.insert("Message", "status=200");
//! assert_eq!(event.get("message").and_then(Value::as_str), Some("status=200"));
//! ```

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 이벤트 타입을 담는 예약 필드명
pub const FIELD_TYPE: &str = "type";
/// 원본 메시지 필드명
pub const FIELD_MESSAGE: &str = "message";
/// 호스트 필드명
pub const FIELD_HOST: &str = "host";
/// 기본 타임스탬프 필드명
pub const FIELD_TIMESTAMP: &str = "@timestamp";

/// 이벤트 필드 값
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON `null` (리스너 입력 왕복용)
    Null,
    /// 문자열
    String(String),
    /// 정수
    Integer(i64),
    /// 부동소수점
    Float(f64),
    /// 불리언
    Boolean(bool),
    /// 타임스탬프 (오프셋 보존)
    Timestamp(DateTime<FixedOffset>),
    /// 중첩 이벤트
    Object(Event),
    /// 순서 있는 값 목록
    Array(Vec<Value>),
}

impl Value {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// 정수 값이면 반환합니다.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// 숫자 값이면 f64로 반환합니다.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// 불리언 값이면 반환합니다.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// 타임스탬프 값이면 반환합니다.
    pub fn as_timestamp(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// 배열 값이면 참조를 반환합니다.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// 중첩 이벤트 값이면 참조를 반환합니다.
    pub fn as_object(&self) -> Option<&Event> {
        match self {
            Self::Object(event) => Some(event),
            _ => None,
        }
    }

    /// `null` 여부
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 값의 정규 문자열 표현을 반환합니다.
    ///
    /// 패턴 매칭, `%{field}` 치환, 조건 비교가 모두 이 표현을 사용합니다.
    /// 배열은 `,`로 연결하고, 중첩 이벤트는 압축 JSON으로 표현합니다.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::String(s) => Cow::Borrowed(s),
            Self::Integer(n) => Cow::Owned(n.to_string()),
            Self::Float(f) => Cow::Owned(f.to_string()),
            Self::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Timestamp(ts) => Cow::Owned(format_timestamp(ts)),
            Self::Array(items) => Cow::Owned(
                items
                    .iter()
                    .map(|v| v.to_text().into_owned())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Self::Object(event) => {
                Cow::Owned(serde_json::to_string(event).unwrap_or_default())
            }
        }
    }

    /// 로깅용 값 타입 이름
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Timestamp(_) => "timestamp",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
        }
    }
}

/// 타임스탬프를 밀리초 정밀도의 RFC 3339 문자열로 변환합니다.
///
/// UTC 오프셋은 `Z`로 표기합니다.
pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(ts: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(ts)
    }
}

impl From<DateTime<chrono::Utc>> for Value {
    fn from(ts: DateTime<chrono::Utc>) -> Self {
        Self::Timestamp(ts.fixed_offset())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        Self::Object(event)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(Event::from(map)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Integer(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
            Self::Object(event) => event.serialize(serializer),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

/// 이벤트 필드 (원래 철자 + 값)
#[derive(Debug, Clone, PartialEq)]
struct Field {
    name: String,
    value: Value,
}

/// 로그 이벤트: 대소문자 무시 조회를 지원하는 순서 보존 필드 맵
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    /// 소문자 키 -> 필드
    fields: IndexMap<String, Field>,
}

/// 조회 키를 정규화합니다. 대문자가 없으면 할당하지 않습니다.
fn lookup_key(name: &str) -> Cow<'_, str> {
    if name.chars().any(char::is_uppercase) {
        Cow::Owned(name.to_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

impl Event {
    /// 빈 이벤트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드를 설정합니다.
    ///
    /// 같은 이름(대소문자 무시)의 필드가 있으면 위치와 철자를 유지한 채 값만 덮어쓰고
    /// 이전 값을 반환합니다.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        let key = lookup_key(&name).into_owned();
        match self.fields.get_mut(&key) {
            Some(field) => Some(std::mem::replace(&mut field.value, value)),
            None => {
                self.fields.insert(key, Field { name, value });
                None
            }
        }
    }

    /// 필드 값을 조회합니다 (대소문자 무시).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(lookup_key(name).as_ref()).map(|f| &f.value)
    }

    /// 필드 값에 대한 가변 참조를 반환합니다.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .get_mut(lookup_key(name).as_ref())
            .map(|f| &mut f.value)
    }

    /// 필드 값의 정규 문자열 표현을 반환합니다.
    pub fn get_text(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(Value::to_text)
    }

    /// 필드 존재 여부
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(lookup_key(name).as_ref())
    }

    /// 필드를 제거합니다. 나머지 필드의 순서는 유지됩니다.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields
            .shift_remove(lookup_key(name).as_ref())
            .map(|f| f.value)
    }

    /// `old_name` 필드의 값을 `new_name`으로 옮깁니다.
    ///
    /// `old_name`이 없으면 아무것도 하지 않고 `false`를 반환합니다.
    /// 두 이름이 대소문자만 다르면 위치를 유지한 채 철자만 바꿉니다.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        let old_key = lookup_key(old_name);
        let new_key = lookup_key(new_name);

        if old_key == new_key {
            return match self.fields.get_mut(old_key.as_ref()) {
                Some(field) => {
                    field.name = new_name.to_owned();
                    true
                }
                None => false,
            };
        }

        match self.fields.shift_remove(old_key.as_ref()) {
            Some(field) => {
                self.fields.shift_remove(new_key.as_ref());
                self.fields.insert(
                    new_key.into_owned(),
                    Field {
                        name: new_name.to_owned(),
                        value: field.value,
                    },
                );
                true
            }
            None => false,
        }
    }

    /// `(필드명, 값)`을 삽입 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.values().map(|f| (f.name.as_str(), &f.value))
    }

    /// 필드 이름을 삽입 순서대로 반환합니다.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.values().map(|f| f.name.as_str())
    }

    /// 필드 수
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// 필드가 하나도 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 이벤트가 선언한 타입 (`type` 필드의 문자열 값)
    pub fn event_type(&self) -> Option<&str> {
        self.get(FIELD_TYPE).and_then(Value::as_str)
    }

    /// JSON 객체 문자열에서 이벤트를 생성합니다.
    ///
    /// 최상위가 객체가 아니면 에러를 반환합니다.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// 이벤트를 와이어 표현(한 줄 JSON 문서)으로 직렬화합니다.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Event {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let mut event = Event::new();
        for (name, value) in map {
            event.insert(name, Value::from(value));
        }
        event
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Event {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = Event::new();
        for (name, value) in iter {
            event.insert(name, value);
        }
        event
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(Event::from(map))
    }
}
