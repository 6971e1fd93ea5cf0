//! 내장 Grok 패턴 라이브러리
//!
//! logstash 코어 패턴의 부분 집합입니다. `regex` 크레이트가 지원하지 않는
//! lookaround를 쓰는 원본 정의는 동등한 범위의 단순한 형태로 바꿨습니다.
//!
//! 정의 안의 `%{NAME}` 참조는 캡처하지 않고, `%{NAME:field}` 참조는
//! 어느 깊이에서든 `field`로 캡처합니다.

use std::collections::HashMap;

use once_cell::sync::Lazy;

const IPV6: &str = concat!(
    r"(?:(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,6}:[0-9A-Fa-f]{1,4}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,5}(?::[0-9A-Fa-f]{1,4}){1,2}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,4}(?::[0-9A-Fa-f]{1,4}){1,3}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,3}(?::[0-9A-Fa-f]{1,4}){1,4}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,2}(?::[0-9A-Fa-f]{1,4}){1,5}",
    r"|[0-9A-Fa-f]{1,4}:(?::[0-9A-Fa-f]{1,4}){1,6}",
    r"|(?:[0-9A-Fa-f]{1,4}:){1,7}:",
    r"|:(?:(?::[0-9A-Fa-f]{1,4}){1,7}|:))",
);

const MONTH: &str = concat!(
    r"\b(?:[Jj]an(?:uary)?|[Ff]eb(?:ruary)?|[Mm]ar(?:ch)?|[Aa]pr(?:il)?|[Mm]ay",
    r"|[Jj]un(?:e)?|[Jj]ul(?:y)?|[Aa]ug(?:ust)?|[Ss]ep(?:tember)?|[Oo]ct(?:ober)?",
    r"|[Nn]ov(?:ember)?|[Dd]ec(?:ember)?)\b",
);

const LOGLEVEL: &str = concat!(
    r"(?:[Aa]lert|ALERT|[Tt]race|TRACE|[Dd]ebug|DEBUG|[Nn]otice|NOTICE|[Ii]nfo|INFO",
    r"|[Ww]arn?(?:ing)?|WARN?(?:ING)?|[Ee]rr?(?:or)?|ERR?(?:OR)?|[Cc]rit?(?:ical)?",
    r"|CRIT?(?:ICAL)?|[Ff]atal|FATAL|[Ss]evere|SEVERE|EMERG(?:ENCY)?|[Ee]merg(?:ency)?)",
);

const COMMONAPACHELOG: &str = concat!(
    r"%{IPORHOST:clientip} %{USER:ident} %{USER:auth} \[%{HTTPDATE:timestamp}\] ",
    r#""(?:%{WORD:verb} %{NOTSPACE:request}(?: HTTP/%{NUMBER:httpversion})?|%{DATA:rawrequest})" "#,
    r"%{NUMBER:response} (?:%{NUMBER:bytes}|-)",
);

/// 이름 -> 정의
static BUILTIN_PATTERNS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut patterns = HashMap::new();

    // 식별자
    patterns.insert("USERNAME", r"[a-zA-Z0-9._-]+");
    patterns.insert("USER", r"%{USERNAME}");
    patterns.insert("EMAILLOCALPART", r"[a-zA-Z0-9!#$%&'*+/=?^_`{|}~.-]+");
    patterns.insert("EMAILADDRESS", r"%{EMAILLOCALPART}@%{HOSTNAME}");
    patterns.insert(
        "UUID",
        r"[A-Fa-f0-9]{8}-(?:[A-Fa-f0-9]{4}-){3}[A-Fa-f0-9]{12}",
    );

    // 숫자
    patterns.insert("INT", r"[+-]?[0-9]+");
    patterns.insert("BASE10NUM", r"[+-]?(?:[0-9]+(?:\.[0-9]+)?|\.[0-9]+)");
    patterns.insert("NUMBER", r"%{BASE10NUM}");
    patterns.insert("BASE16NUM", r"[+-]?(?:0[xX])?[0-9A-Fa-f]+");
    patterns.insert("POSINT", r"\b[1-9][0-9]*\b");
    patterns.insert("NONNEGINT", r"\b[0-9]+\b");

    // 문자열
    patterns.insert("WORD", r"\b\w+\b");
    patterns.insert("NOTSPACE", r"\S+");
    patterns.insert("SPACE", r"\s*");
    patterns.insert("DATA", r".*?");
    patterns.insert("GREEDYDATA", r".*");
    patterns.insert(
        "QUOTEDSTRING",
        r#"(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`)"#,
    );
    patterns.insert("QS", r"%{QUOTEDSTRING}");

    // 네트워크
    patterns.insert("CISCOMAC", r"(?:[A-Fa-f0-9]{4}\.){2}[A-Fa-f0-9]{4}");
    patterns.insert("WINDOWSMAC", r"(?:[A-Fa-f0-9]{2}-){5}[A-Fa-f0-9]{2}");
    patterns.insert("COMMONMAC", r"(?:[A-Fa-f0-9]{2}:){5}[A-Fa-f0-9]{2}");
    patterns.insert("MAC", r"%{CISCOMAC}|%{WINDOWSMAC}|%{COMMONMAC}");
    patterns.insert(
        "IPV4",
        r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)",
    );
    patterns.insert("IPV6", IPV6);
    patterns.insert("IP", r"%{IPV6}|%{IPV4}");
    patterns.insert(
        "HOSTNAME",
        r"\b[0-9A-Za-z][0-9A-Za-z-]{0,62}(?:\.[0-9A-Za-z][0-9A-Za-z-]{0,62})*\.?",
    );
    patterns.insert("IPORHOST", r"%{IP}|%{HOSTNAME}");
    patterns.insert("HOSTPORT", r"%{IPORHOST}:%{POSINT}");

    // 경로와 URI
    patterns.insert("UNIXPATH", r"(?:/[\w%!$@:.,+~-]*)+");
    patterns.insert("WINPATH", r"(?:[A-Za-z]+:|\\)(?:\\[^\\?*]*)+");
    patterns.insert("PATH", r"%{UNIXPATH}|%{WINPATH}");
    patterns.insert("URIPROTO", r"[A-Za-z][A-Za-z0-9+.-]+");
    patterns.insert("URIHOST", r"%{IPORHOST}(?::%{POSINT})?");
    patterns.insert("URIPATH", r"(?:/[A-Za-z0-9$.+!*'(){},~:;=@#%&_-]*)+");
    patterns.insert("URIPARAM", r"\?[A-Za-z0-9$.+!*'|(){},~@#%&/=:;_?\[\]<>-]*");
    patterns.insert("URIPATHPARAM", r"%{URIPATH}(?:%{URIPARAM})?");
    patterns.insert(
        "URI",
        r"%{URIPROTO}://(?:%{USER}(?::[^@]*)?@)?(?:%{URIHOST})?(?:%{URIPATHPARAM})?",
    );

    // 날짜와 시간
    patterns.insert("MONTH", MONTH);
    patterns.insert("MONTHNUM", r"(?:0?[1-9]|1[0-2])");
    patterns.insert("MONTHNUM2", r"(?:0[1-9]|1[0-2])");
    patterns.insert("MONTHDAY", r"(?:0[1-9]|[12][0-9]|3[01]|[1-9])");
    patterns.insert(
        "DAY",
        r"(?:Mon(?:day)?|Tue(?:sday)?|Wed(?:nesday)?|Thu(?:rsday)?|Fri(?:day)?|Sat(?:urday)?|Sun(?:day)?)",
    );
    patterns.insert("YEAR", r"(?:\d\d){1,2}");
    patterns.insert("HOUR", r"(?:2[0123]|[01]?[0-9])");
    patterns.insert("MINUTE", r"(?:[0-5][0-9])");
    patterns.insert("SECOND", r"(?:(?:[0-5]?[0-9]|60)(?:[:.,][0-9]+)?)");
    patterns.insert("TIME", r"%{HOUR}:%{MINUTE}(?::%{SECOND})?");
    patterns.insert("DATE_US", r"%{MONTHNUM}[/-]%{MONTHDAY}[/-]%{YEAR}");
    patterns.insert("DATE_EU", r"%{MONTHDAY}[./-]%{MONTHNUM}[./-]%{YEAR}");
    patterns.insert("DATE", r"%{DATE_US}|%{DATE_EU}");
    patterns.insert("DATESTAMP", r"%{DATE}[- ]%{TIME}");
    patterns.insert("ISO8601_TIMEZONE", r"(?:Z|[+-]%{HOUR}(?::?%{MINUTE}))");
    patterns.insert(
        "TIMESTAMP_ISO8601",
        r"%{YEAR}-%{MONTHNUM}-%{MONTHDAY}[T ]%{HOUR}:?%{MINUTE}(?::?%{SECOND})?%{ISO8601_TIMEZONE}?",
    );
    patterns.insert("TZ", r"(?:[APMCE][SD]T|UTC)");
    patterns.insert(
        "DATESTAMP_RFC822",
        r"%{DAY} %{MONTH} %{MONTHDAY} %{YEAR} %{TIME} %{TZ}",
    );
    patterns.insert("HTTPDATE", r"%{MONTHDAY}/%{MONTH}/%{YEAR}:%{TIME} %{INT}");
    patterns.insert("SYSLOGTIMESTAMP", r"%{MONTH} +%{MONTHDAY} %{TIME}");

    // syslog
    patterns.insert("PROG", r"[\x21-\x5a\x5c\x5e-\x7e]+");
    patterns.insert("SYSLOGPROG", r"%{PROG:program}(?:\[%{POSINT:pid}\])?");
    patterns.insert("SYSLOGHOST", r"%{IPORHOST}");
    patterns.insert(
        "SYSLOGFACILITY",
        r"<%{NONNEGINT:facility}.%{NONNEGINT:priority}>",
    );
    patterns.insert(
        "SYSLOGBASE",
        r"%{SYSLOGTIMESTAMP:timestamp} (?:%{SYSLOGFACILITY} )?%{SYSLOGHOST:logsource} %{SYSLOGPROG}:",
    );
    patterns.insert("LOGLEVEL", LOGLEVEL);

    // 웹 서버
    patterns.insert("COMMONAPACHELOG", COMMONAPACHELOG);
    patterns.insert(
        "COMBINEDAPACHELOG",
        r"%{COMMONAPACHELOG} %{QS:referrer} %{QS:agent}",
    );

    patterns
});

/// 내장 패턴 정의를 조회합니다.
pub fn builtin(name: &str) -> Option<&'static str> {
    BUILTIN_PATTERNS.get(name).copied()
}

/// 내장 패턴 이름을 정렬해 반환합니다.
pub fn builtin_names() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTIN_PATTERNS.keys().copied().collect();
    names.sort_unstable();
    names
}
