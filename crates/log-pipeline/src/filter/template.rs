//! `%{field}` 치환
//!
//! 필드 추가, 이름 변경, 값 교체에서 사용하는 단순 템플릿 확장입니다.
//! 필드 조회 외의 표현식은 지원하지 않습니다. 이벤트에 없는 필드를 가리키는
//! 토큰은 원문 그대로 남깁니다.

use std::borrow::Cow;

use logship_core::event::Event;

/// 템플릿에 `%{...}` 참조가 있는지 확인합니다.
pub fn has_references(template: &str) -> bool {
    template.contains("%{")
}

/// 템플릿의 `%{field}` 토큰을 이벤트 필드 값으로 치환합니다.
pub fn interpolate<'a>(template: &'a str, event: &Event) -> Cow<'a, str> {
    if !has_references(template) {
        return Cow::Borrowed(template);
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match event.get_text(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[start..start + 2 + end + 1]),
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
