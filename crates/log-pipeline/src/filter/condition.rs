//! 필터 적용 조건식
//!
//! 이벤트 필드에 대한 작은 불리언 표현식입니다. 부작용이 없고, 구성 시점에 한 번
//! 파싱된 뒤 이벤트마다 평가됩니다.
//!
//! ```text
//! expr    := or
//! or      := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | field ( ("==" | "!=") literal )?
//! field   := "[" name "]" ( "[" name "]" )* | ident
//! literal := "..." | '...' | integer | float | true | false
//! ```
//!
//! 연산자 없는 필드는 존재 여부 검사입니다. `[a][b]`는 중첩 이벤트 `a` 안의 `b`를 가리킵니다.
//! `!`와 괄호의 중첩은 [`MAX_CONDITION_DEPTH`]단계까지 허용합니다.

use std::fmt;

use logship_core::event::{Event, Value};

use crate::error::LogPipelineError;

/// `!`/괄호 중첩 최대 깊이
pub const MAX_CONDITION_DEPTH: usize = 32;

/// 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

/// 비교 리터럴
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// 문자열
    Text(String),
    /// 정수
    Integer(i64),
    /// 부동소수점
    Float(f64),
    /// 불리언
    Boolean(bool),
}

impl Literal {
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// 파싱된 조건식
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// 필드 존재
    Exists(Vec<String>),
    /// 필드 값 비교
    Compare {
        /// 필드 경로
        path: Vec<String>,
        /// 연산자
        op: CompareOp,
        /// 비교 대상
        literal: Literal,
    },
    /// 부정
    Not(Box<Condition>),
    /// 논리곱 (항 2개 이상)
    And(Vec<Condition>),
    /// 논리합 (항 2개 이상)
    Or(Vec<Condition>),
}

impl Condition {
    /// 조건식을 파싱합니다.
    pub fn parse(expression: &str) -> Result<Self, LogPipelineError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            expression,
            tokens,
            pos: 0,
            depth: 0,
        };
        let condition = parser.parse_or()?;
        match parser.peek() {
            None => Ok(condition),
            Some((offset, token)) => {
                Err(parser.error(*offset, format!("unexpected {token}")))
            }
        }
    }

    /// 이벤트에 대해 조건을 평가합니다.
    pub fn evaluate(&self, event: &Event) -> bool {
        match self {
            Self::Exists(path) => lookup(event, path).is_some(),
            Self::Compare { path, op, literal } => {
                let equal = lookup(event, path).is_some_and(|value| matches(value, literal));
                match op {
                    CompareOp::Eq => equal,
                    CompareOp::Ne => !equal,
                }
            }
            Self::Not(inner) => !inner.evaluate(event),
            Self::And(terms) => terms.iter().all(|term| term.evaluate(event)),
            Self::Or(terms) => terms.iter().any(|term| term.evaluate(event)),
        }
    }
}

fn lookup<'e>(event: &'e Event, path: &[String]) -> Option<&'e Value> {
    let (first, rest) = path.split_first()?;
    let mut value = event.get(first)?;
    for segment in rest {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

fn matches(value: &Value, literal: &Literal) -> bool {
    let text = value.to_text();
    if let Some(expected) = literal.as_number()
        && let Ok(actual) = text.trim().parse::<f64>()
    {
        return actual == expected;
    }
    text == literal.to_string()
}

// ─── Lexer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Not,
    And,
    Or,
    Eq,
    Ne,
    Field(Vec<String>),
    Ident(String),
    Str(String),
    Number(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Not => f.write_str("'!'"),
            Self::And => f.write_str("'&&'"),
            Self::Or => f.write_str("'||'"),
            Self::Eq => f.write_str("'=='"),
            Self::Ne => f.write_str("'!='"),
            Self::Field(path) => write!(f, "field [{}]", path.join("][")),
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Str(s) => write!(f, "string \"{s}\""),
            Self::Number(n) => write!(f, "number {n}"),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '@'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '-')
}

fn tokenize(expression: &str) -> Result<Vec<(usize, Token)>, LogPipelineError> {
    let err = |offset: usize, reason: String| LogPipelineError::Condition {
        expression: expression.to_owned(),
        offset,
        reason,
    };

    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((offset, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((offset, Token::RParen));
            }
            '!' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    tokens.push((offset, Token::Ne));
                } else {
                    tokens.push((offset, Token::Not));
                }
            }
            '=' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '=').is_none() {
                    return Err(err(offset, "expected '=='".to_owned()));
                }
                tokens.push((offset, Token::Eq));
            }
            '&' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '&').is_none() {
                    return Err(err(offset, "expected '&&'".to_owned()));
                }
                tokens.push((offset, Token::And));
            }
            '|' => {
                chars.next();
                if chars.next_if(|&(_, c)| c == '|').is_none() {
                    return Err(err(offset, "expected '||'".to_owned()));
                }
                tokens.push((offset, Token::Or));
            }
            '[' => {
                let mut path = Vec::new();
                while chars.next_if(|&(_, c)| c == '[').is_some() {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, ']')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(err(offset, "unterminated '['".to_owned())),
                        }
                    }
                    if name.is_empty() {
                        return Err(err(offset, "empty field reference".to_owned()));
                    }
                    path.push(name);
                }
                tokens.push((offset, Token::Field(path)));
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\\')) => match chars.next() {
                            Some((_, escaped)) => value.push(escaped),
                            None => return Err(err(offset, "unterminated string".to_owned())),
                        },
                        Some((_, c)) if c == quote => break,
                        Some((_, c)) => value.push(c),
                        None => return Err(err(offset, "unterminated string".to_owned())),
                    }
                }
                tokens.push((offset, Token::Str(value)));
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let mut number = String::new();
                number.push(c);
                chars.next();
                while let Some((_, c)) = chars.next_if(|&(_, c)| c.is_ascii_digit() || c == '.') {
                    number.push(c);
                }
                tokens.push((offset, Token::Number(number)));
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some((_, c)) = chars.next_if(|&(_, c)| is_ident_continue(c)) {
                    name.push(c);
                }
                tokens.push((offset, Token::Ident(name)));
            }
            other => return Err(err(offset, format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

// ─── Parser ─────────────────────────────────────────────────────────

struct Parser<'e> {
    expression: &'e str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
    /// 현재 `!`/괄호 중첩 깊이
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&(usize, Token)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(usize, Token)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().is_some_and(|(_, t)| t == expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn end_offset(&self) -> usize {
        self.expression.len()
    }

    fn error(&self, offset: usize, reason: impl Into<String>) -> LogPipelineError {
        LogPipelineError::Condition {
            expression: self.expression.to_owned(),
            offset,
            reason: reason.into(),
        }
    }

    /// 중첩 한 단계를 들어가 `parse`를 실행합니다.
    fn nested<T>(
        &mut self,
        offset: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, LogPipelineError>,
    ) -> Result<T, LogPipelineError> {
        if self.depth >= MAX_CONDITION_DEPTH {
            return Err(self.error(offset, "nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Condition, LogPipelineError> {
        let mut terms = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            terms.push(self.parse_and()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Condition::Or(terms),
        })
    }

    fn parse_and(&mut self) -> Result<Condition, LogPipelineError> {
        let mut terms = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            terms.push(self.parse_unary()?);
        }
        Ok(match terms.len() {
            1 => terms.remove(0),
            _ => Condition::And(terms),
        })
    }

    fn parse_unary(&mut self) -> Result<Condition, LogPipelineError> {
        if let Some(&(offset, Token::Not)) = self.peek() {
            self.pos += 1;
            let inner = self.nested(offset, Self::parse_unary)?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, LogPipelineError> {
        let path = match self.next() {
            Some((offset, Token::LParen)) => {
                let inner = self.nested(offset, Self::parse_or)?;
                return match self.next() {
                    Some((_, Token::RParen)) => Ok(inner),
                    Some((offset, token)) => {
                        Err(self.error(offset, format!("expected ')', found {token}")))
                    }
                    None => Err(self.error(self.end_offset(), "expected ')'")),
                };
            }
            Some((_, Token::Field(path))) => path,
            Some((_, Token::Ident(name))) => vec![name],
            Some((offset, token)) => {
                return Err(self.error(offset, format!("expected field, found {token}")));
            }
            None => return Err(self.error(self.end_offset(), "expected field")),
        };

        let op = if self.eat(&Token::Eq) {
            CompareOp::Eq
        } else if self.eat(&Token::Ne) {
            CompareOp::Ne
        } else {
            return Ok(Condition::Exists(path));
        };

        let literal = self.parse_literal()?;
        Ok(Condition::Compare { path, op, literal })
    }

    fn parse_literal(&mut self) -> Result<Literal, LogPipelineError> {
        match self.next() {
            Some((_, Token::Str(s))) => Ok(Literal::Text(s)),
            Some((_, Token::Ident(word))) if word == "true" => Ok(Literal::Boolean(true)),
            Some((_, Token::Ident(word))) if word == "false" => Ok(Literal::Boolean(false)),
            Some((offset, Token::Number(n))) => {
                if let Ok(i) = n.parse::<i64>() {
                    Ok(Literal::Integer(i))
                } else if let Ok(f) = n.parse::<f64>() {
                    Ok(Literal::Float(f))
                } else {
                    Err(self.error(offset, format!("invalid number '{n}'")))
                }
            }
            Some((offset, token)) => {
                Err(self.error(offset, format!("expected literal, found {token}")))
            }
            None => Err(self.error(self.end_offset(), "expected literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        let mut event = Event::new();
        event.insert("type", "iis");
        event.insert("status", "404");
        event.insert("bytes", 1024);
        event.insert("secure", true);
        let mut req = Event::new();
        req.insert("path", "/health");
        event.insert("req", req);
        event
    }

    fn eval(expr: &str) -> bool {
        Condition::parse(expr).unwrap().evaluate(&event())
    }

    #[test]
    fn bare_field_is_existence() {
        assert!(eval("[status]"));
        assert!(eval("status"));
        assert!(!eval("[missing]"));
        assert!(eval("![missing]"));
    }

    #[test]
    fn string_equality() {
        assert!(eval(r#"[type] == "iis""#));
        assert!(eval("[type] == 'iis'"));
        assert!(!eval(r#"[type] == "IIS""#));
        assert!(eval(r#"[type] != "apache""#));
    }

    #[test]
    fn numeric_equality_uses_numbers() {
        assert!(eval("[status] == 404"));
        assert!(eval("[bytes] == 1024.0"));
        assert!(eval("[status] != 200"));
    }

    #[test]
    fn boolean_literal() {
        assert!(eval("[secure] == true"));
        assert!(!eval("[secure] == false"));
    }

    #[test]
    fn missing_field_comparisons() {
        assert!(!eval(r#"[missing] == "x""#));
        assert!(eval(r#"[missing] != "x""#));
    }

    #[test]
    fn nested_path() {
        assert!(eval(r#"[req][path] == "/health""#));
        assert!(!eval("[req][query]"));
        assert!(!eval("[status][path]"));
    }

    #[test]
    fn precedence_and_grouping() {
        // && 가 || 보다 먼저 묶입니다.
        assert!(eval("[missing] && [status] || [type]"));
        assert!(!eval("[missing] && ([status] || [type])"));
        assert!(eval("!([missing] || [other]) && [status] == 404"));
    }

    #[test]
    fn parse_errors_report_offset() {
        let err = Condition::parse("[status] ==").unwrap_err();
        match err {
            LogPipelineError::Condition { offset, .. } => assert_eq!(offset, 11),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_syntax_is_rejected() {
        for expr in ["", "[a] = 1", "[a] & [b]", "([a]", "[a] [b]", "[unterminated", "[a] == bare"] {
            assert!(Condition::parse(expr).is_err(), "'{expr}' should fail");
        }
    }

    fn nesting_error_offset(expr: &str) -> usize {
        match Condition::parse(expr).unwrap_err() {
            LogPipelineError::Condition { offset, reason, .. } => {
                assert_eq!(reason, "nesting too deep");
                offset
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn nesting_up_to_limit_is_accepted() {
        let negations = format!("{}[missing]", "!".repeat(MAX_CONDITION_DEPTH));
        // 짝수 번 부정이면 원래 값과 같습니다.
        assert!(!eval(&negations));

        let groups = format!(
            "{}[status]{}",
            "(".repeat(MAX_CONDITION_DEPTH),
            ")".repeat(MAX_CONDITION_DEPTH)
        );
        assert!(eval(&groups));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let negations = format!("{}[a]", "!".repeat(200_000));
        assert_eq!(nesting_error_offset(&negations), MAX_CONDITION_DEPTH);

        let groups = format!("{}[a]", "(".repeat(200_000));
        assert_eq!(nesting_error_offset(&groups), MAX_CONDITION_DEPTH);
    }

    #[test]
    fn long_chains_stay_flat() {
        let chain = vec!["[status]"; 100_000].join(" && ");
        let condition = Condition::parse(&chain).unwrap();
        match &condition {
            Condition::And(terms) => assert_eq!(terms.len(), 100_000),
            other => panic!("unexpected condition: {other:?}"),
        }
        assert!(condition.evaluate(&event()));

        let alternatives = format!("{} || [type]", vec!["[missing]"; 1_000].join(" || "));
        assert!(eval(&alternatives));
    }
}
