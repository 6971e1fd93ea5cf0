//! 필터 체인 벤치마크
//!
//! Grok 추출, 날짜 파싱, 전체 체인, 큐 적재의 처리량을 측정합니다.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use logship_core::config::{DateConfig, DropPolicy, FilterConfig, GrokConfig, GrokMatch, MutateConfig};
use logship_core::event::Event;
use logship_pipeline::{FilterChain, PatternResolver, PendingQueue};

const SYSLOG_LINE: &str =
    "Oct 11 22:14:15 web-01 sshd[4123]: Failed password for root from 203.0.113.45 port 22 ssh2";

const APACHE_LINE: &str = r#"203.0.113.45 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#;

fn grok(pattern: &str) -> FilterConfig {
    FilterConfig::Grok(GrokConfig {
        matches: vec![GrokMatch {
            field: "message".to_owned(),
            pattern: pattern.to_owned(),
        }],
        ..Default::default()
    })
}

fn event(message: &str) -> Event {
    let mut event = Event::new();
    event.insert("message", message);
    event.insert("type", "syslog");
    event
}

fn bench_grok(c: &mut Criterion) {
    let resolver = PatternResolver::new();
    let mut group = c.benchmark_group("grok");
    group.throughput(Throughput::Elements(1));

    let cases = [
        ("syslogbase", "%{SYSLOGBASE} %{GREEDYDATA:body}", SYSLOG_LINE),
        ("combined_apache", "%{COMBINEDAPACHELOG}", APACHE_LINE),
        ("no_match", "%{IPV6:addr} only", SYSLOG_LINE),
    ];
    for (name, pattern, line) in cases {
        let chain = FilterChain::from_configs(&[grok(pattern)], &resolver).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| {
                let mut e = event(line);
                black_box(chain.run(&mut e));
            })
        });
    }
    group.finish();
}

fn bench_full_chain(c: &mut Criterion) {
    let resolver = PatternResolver::new();
    let configs = vec![
        grok("%{SYSLOGTIMESTAMP:logged_at} %{SYSLOGHOST:logsource} %{SYSLOGPROG}: %{GREEDYDATA:body}"),
        FilterConfig::Date(DateConfig {
            field: "logged_at".to_owned(),
            patterns: vec!["MMM dd HH:mm:ss".to_owned()],
            convert_to_utc: true,
            ..Default::default()
        }),
        FilterConfig::Mutate(MutateConfig {
            condition: Some("[program] == \"sshd\"".to_owned()),
            rename: vec![("body".to_owned(), "auth_message".to_owned())],
            split: vec![("logsource".to_owned(), "-".to_owned())],
            ..Default::default()
        }),
    ];
    let chain = FilterChain::from_configs(&configs, &resolver).unwrap();

    let mut group = c.benchmark_group("chain");
    group.throughput(Throughput::Elements(1));
    group.bench_function("grok_date_mutate", |b| {
        b.iter(|| {
            let mut e = event(black_box(SYSLOG_LINE));
            black_box(chain.run(&mut e));
        })
    });
    group.bench_function("serialize_after_chain", |b| {
        b.iter(|| {
            let mut e = event(black_box(SYSLOG_LINE));
            chain.run(&mut e);
            black_box(e.to_json_string().unwrap())
        })
    });
    group.finish();
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue");
    group.throughput(Throughput::Elements(1000));

    let document = event(SYSLOG_LINE).to_json_string().unwrap();
    group.bench_function("push_drain_1000", |b| {
        let queue = PendingQueue::unbounded();
        b.iter(|| {
            for _ in 0..1000 {
                queue.push(document.clone());
            }
            black_box(queue.drain())
        })
    });
    group.bench_function("bounded_overflow_1000", |b| {
        let queue = PendingQueue::new(Some(100), DropPolicy::Oldest);
        b.iter(|| {
            for _ in 0..1000 {
                queue.push(document.clone());
            }
            black_box(queue.drain())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_grok, bench_full_chain, bench_queue);
criterion_main!(benches);
