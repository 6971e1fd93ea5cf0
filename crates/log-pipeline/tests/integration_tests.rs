//! 통합 테스트 -- 리스너부터 전송까지의 전체 흐름 검증

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use logship_core::config::{LogshipConfig, OutputConfig, OutputKind, TcpInputConfig};
use logship_core::error::TransportError;
use logship_core::event::{Event, Value};
use logship_core::pipeline::{EventHandler, Listener, Output, Pipeline, Transport};
use logship_pipeline::{
    ChainResult, FilterChain, OutputSender, PatternResolver, RedisTransport, TcpListenerInput,
};

/// 받은 배치를 기록하는 전송
#[derive(Clone, Default)]
struct Recording {
    batches: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl Recording {
    fn messages(&self) -> Vec<String> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, batch)| batch.clone())
            .collect()
    }
}

impl Transport for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_batch(
        &self,
        host: &str,
        _port: u16,
        _timeout: Duration,
        _target: &str,
        messages: &[String],
    ) -> Result<(), TransportError> {
        self.batches
            .lock()
            .unwrap()
            .push((host.to_owned(), messages.to_vec()));
        Ok(())
    }
}

fn chain_from_toml(toml: &str) -> FilterChain {
    let config = LogshipConfig::parse(toml).unwrap();
    let resolver = PatternResolver::with_patterns(config.patterns.clone());
    FilterChain::from_configs(&config.filters, &resolver).unwrap()
}

fn output(name: &str, flush_ms: u64) -> OutputConfig {
    OutputConfig {
        name: name.to_owned(),
        kind: OutputKind::Redis,
        hosts: vec!["h1".to_owned()],
        flush_interval_ms: flush_ms,
        timeout_ms: 500,
        ..Default::default()
    }
}

async fn eventually<F: Fn() -> bool>(check: F) {
    for _ in 0..300 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[test]
fn grok_extracts_status_and_keeps_event() {
    let chain = chain_from_toml(
        r#"
[[filters]]
kind = "grok"
matches = [{ field = "message", pattern = "status=%{INT:status}" }]
"#,
    );

    let mut event = Event::new();
    event.insert("message", "status=200");
    assert_eq!(chain.run(&mut event), ChainResult::Keep);

    let mut expected = Event::new();
    expected.insert("message", "status=200");
    expected.insert("status", "200");
    assert_eq!(event, expected);
}

#[test]
fn syslog_line_through_grok_date_and_mutate() {
    let chain = chain_from_toml(
        r#"
[[filters]]
kind = "grok"
matches = [{ field = "message", pattern = "%{TIMESTAMP_ISO8601:logged_at} %{LOGLEVEL:level} %{GREEDYDATA:body}" }]
add_field = [["source", "%{level}-app"]]

[[filters]]
kind = "date"
field = "logged_at"
target = "@timestamp"
patterns = ["yyyy-MM-dd HH:mm:ss"]
convert_to_utc = true

[[filters]]
kind = "mutate"
condition = "[level] == \"ERROR\""
rename = [["body", "error_text"]]
replace = [["severity", "high"]]
"#,
    );
    assert_eq!(chain.names(), vec!["grok", "date", "mutate"]);

    let mut event = Event::new();
    event.insert("message", "2015-08-01 10:00:00 ERROR disk full");
    assert_eq!(chain.run(&mut event), ChainResult::Keep);

    assert_eq!(event.get_text("level").as_deref(), Some("ERROR"));
    assert_eq!(event.get_text("source").as_deref(), Some("ERROR-app"));
    assert_eq!(event.get_text("error_text").as_deref(), Some("disk full"));
    assert!(!event.contains("body"));
    assert_eq!(event.get_text("severity").as_deref(), Some("high"));

    let ts = event.get("@timestamp").and_then(Value::as_timestamp).unwrap();
    assert_eq!(ts.to_rfc3339(), "2015-08-01T10:00:00+00:00");
}

#[test]
fn drop_on_match_stops_the_chain() {
    let chain = chain_from_toml(
        r#"
[[filters]]
kind = "grok"
matches = [{ field = "message", pattern = "^healthcheck" }]
drop_if_match = true

[[filters]]
kind = "mutate"
replace = [["seen", "yes"]]
"#,
    );

    let mut probe = Event::new();
    probe.insert("message", "healthcheck ok");
    assert_eq!(chain.run(&mut probe), ChainResult::Drop);
    assert!(!probe.contains("seen"));

    let mut normal = Event::new();
    normal.insert("message", "GET /index.html");
    assert_eq!(chain.run(&mut normal), ChainResult::Keep);
    assert_eq!(normal.get_text("seen").as_deref(), Some("yes"));
}

#[test]
fn custom_patterns_from_config() {
    let chain = chain_from_toml(
        r#"
[patterns]
ORDER_ID = "ORD-%{INT}"

[[filters]]
kind = "grok"
type = "shop"
matches = [{ field = "message", pattern = "order %{ORDER_ID:order}" }]
"#,
    );

    let mut shop = Event::new();
    shop.insert("type", "shop");
    shop.insert("message", "order ORD-991 paid");
    chain.run(&mut shop);
    assert_eq!(shop.get_text("order").as_deref(), Some("ORD-991"));

    let mut other = Event::new();
    other.insert("type", "web");
    other.insert("message", "order ORD-991 paid");
    chain.run(&mut other);
    assert!(!other.contains("order"));
}

#[tokio::test]
async fn concurrent_producers_enqueue_every_message() {
    let chain = Arc::new(FilterChain::new());
    let sender = OutputSender::new(
        output("concurrent", 1_000),
        chain,
        Recording::default(),
        CancellationToken::new(),
    )
    .unwrap();

    let handler: Arc<dyn EventHandler> = sender.handler();
    let mut producers = Vec::new();
    for producer in 0..8i64 {
        let handler = Arc::clone(&handler);
        producers.push(tokio::task::spawn_blocking(move || {
            for seq in 0..250i64 {
                let mut event = Event::new();
                event.insert("producer", producer);
                event.insert("seq", seq);
                handler.on_event(event);
            }
        }));
    }
    for producer in producers {
        producer.await.unwrap();
    }

    let stats = sender.stats();
    assert_eq!(stats.received, 2_000);
    assert_eq!(stats.enqueued, 2_000);
    assert_eq!(stats.queue_len, 2_000);
}

#[tokio::test]
async fn tcp_listener_to_sender_delivery() {
    let chain = Arc::new(chain_from_toml(
        r#"
[[filters]]
kind = "grok"
matches = [{ field = "message", pattern = "status=%{INT:status}" }]
"#,
    ));

    let root = CancellationToken::new();
    let transport = Recording::default();
    let mut sender =
        OutputSender::new(output("e2e", 20), chain, transport.clone(), root.child_token())
            .unwrap();

    let mut listener = TcpListenerInput::new(
        TcpInputConfig {
            name: "tcp-e2e".to_owned(),
            bind: "127.0.0.1:0".to_owned(),
            event_type: Some("access".to_owned()),
            ..Default::default()
        },
        "agent-7",
        root.child_token(),
    );
    sender.connect(&mut listener);

    Pipeline::start(&mut sender).await.unwrap();
    Pipeline::start(&mut listener).await.unwrap();

    let mut client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
    client.write_all(b"status=200\nstatus=503\n").await.unwrap();
    client.flush().await.unwrap();

    eventually(|| transport.messages().len() >= 2).await;
    let delivered: Vec<serde_json::Value> = transport
        .messages()
        .iter()
        .map(|m| serde_json::from_str(m).unwrap())
        .collect();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0]["status"], "200");
    assert_eq!(delivered[1]["status"], "503");
    assert_eq!(delivered[0]["type"], "access");
    assert_eq!(delivered[0]["host"], "agent-7");

    Pipeline::stop(&mut listener).await.unwrap();
    Pipeline::stop(&mut sender).await.unwrap();
    assert_eq!(sender.stats().delivered, 2);
    assert_eq!(sender.stats().lost, 0);
}

#[tokio::test]
async fn redis_transport_receives_batch() {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = server.local_addr().unwrap().port();
    let received = Arc::new(Mutex::new(Vec::<u8>::new()));

    let sink = Arc::clone(&received);
    let fake = tokio::spawn(async move {
        let (mut socket, _) = server.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            let done = {
                let mut all = sink.lock().unwrap();
                all.extend_from_slice(&buf[..n]);
                all.windows(8).any(|w| w == b"checkout")
            };
            if done {
                socket.write_all(b":1\r\n").await.unwrap();
                return;
            }
        }
    });

    let mut config = output("redis-e2e", 20);
    config.hosts = vec!["127.0.0.1".to_owned()];
    config.port = port;
    config.target = "events".to_owned();

    let mut sender = OutputSender::new(
        config,
        Arc::new(FilterChain::new()),
        RedisTransport::new(),
        CancellationToken::new(),
    )
    .unwrap();
    Pipeline::start(&mut sender).await.unwrap();

    let mut event = Event::new();
    event.insert("message", "checkout");
    sender.handler().on_event(event);

    fake.await.unwrap();
    eventually(|| sender.stats().delivered == 1).await;
    Pipeline::stop(&mut sender).await.unwrap();

    let wire = String::from_utf8(received.lock().unwrap().clone()).unwrap();
    assert!(wire.starts_with("*3\r\n$5\r\nRPUSH\r\n$6\r\nevents\r\n"), "{wire}");
    assert!(wire.contains(r#"{"message":"checkout"}"#));
    assert_eq!(sender.stats().delivered, 1);
}

#[test]
fn listener_names_are_exposed() {
    let listener = TcpListenerInput::new(
        TcpInputConfig {
            name: "edge".to_owned(),
            ..Default::default()
        },
        "agent",
        CancellationToken::new(),
    );
    assert_eq!(Listener::name(&listener), "edge");
}
