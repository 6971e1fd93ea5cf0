//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 파이프라인 크레이트는 전역 상태 없이 원자 카운터만 유지하고,
//! 데몬이 주기적으로 이 이름들로 `metrics::counter!()` / `metrics::gauge!()`를 게시합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logship_`
//! - 컴포넌트: `output_`, `input_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logship_core::metrics::OUTPUT_EVENTS_RECEIVED_TOTAL, "output" => "primary")
//!     .absolute(42);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 출력 전송기 이름 레이블 키
pub const LABEL_OUTPUT: &str = "output";

/// 입력(리스너) 이름 레이블 키
pub const LABEL_INPUT: &str = "input";

/// 전송 방식 레이블 키 (redis, stdout)
pub const LABEL_TRANSPORT: &str = "transport";

// ─── Output Sender 메트릭 ───────────────────────────────────────────

/// Output: 수신한 이벤트 수 (counter, label: output)
pub const OUTPUT_EVENTS_RECEIVED_TOTAL: &str = "logship_output_events_received_total";

/// Output: 필터 체인이 드롭한 이벤트 수 (counter, label: output)
pub const OUTPUT_EVENTS_FILTERED_TOTAL: &str = "logship_output_events_filtered_total";

/// Output: 큐에 적재된 메시지 수 (counter, label: output)
pub const OUTPUT_MESSAGES_ENQUEUED_TOTAL: &str = "logship_output_messages_enqueued_total";

/// Output: 전달된 메시지 수 (counter, label: output)
pub const OUTPUT_MESSAGES_DELIVERED_TOTAL: &str = "logship_output_messages_delivered_total";

/// Output: 전달하지 못하고 버린 메시지 수 (counter, label: output)
pub const OUTPUT_MESSAGES_LOST_TOTAL: &str = "logship_output_messages_lost_total";

/// Output: 큐 용량 초과로 버린 메시지 수 (counter, label: output)
pub const OUTPUT_MESSAGES_OVERFLOW_TOTAL: &str = "logship_output_messages_overflow_total";

/// Output: 모든 호스트가 실패한 플러시 사이클 수 (counter, label: output)
pub const OUTPUT_FAILED_CYCLES_TOTAL: &str = "logship_output_failed_cycles_total";

/// Output: 필터 실행 중 panic이 발생한 이벤트 수 (counter, label: output)
pub const OUTPUT_FILTER_PANICS_TOTAL: &str = "logship_output_filter_panics_total";

/// Output: 현재 대기 큐 길이 (gauge, label: output)
pub const OUTPUT_QUEUE_LENGTH: &str = "logship_output_queue_length";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logship_daemon_uptime_seconds";

/// Daemon: 실행 중인 입력 수 (gauge)
pub const DAEMON_INPUTS_RUNNING: &str = "logship_daemon_inputs_running";

/// Daemon: 실행 중인 출력 수 (gauge)
pub const DAEMON_OUTPUTS_RUNNING: &str = "logship_daemon_outputs_running";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "logship_daemon_build_info";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Output Sender
    describe_counter!(
        OUTPUT_EVENTS_RECEIVED_TOTAL,
        "Total number of events received by the output's handler"
    );
    describe_counter!(
        OUTPUT_EVENTS_FILTERED_TOTAL,
        "Total number of events dropped by the filter chain"
    );
    describe_counter!(
        OUTPUT_MESSAGES_ENQUEUED_TOTAL,
        "Total number of serialized events appended to the pending queue"
    );
    describe_counter!(
        OUTPUT_MESSAGES_DELIVERED_TOTAL,
        "Total number of messages delivered to a destination host"
    );
    describe_counter!(
        OUTPUT_MESSAGES_LOST_TOTAL,
        "Total number of messages discarded after all hosts failed or at shutdown"
    );
    describe_counter!(
        OUTPUT_MESSAGES_OVERFLOW_TOTAL,
        "Total number of messages dropped because the pending queue was full"
    );
    describe_counter!(
        OUTPUT_FAILED_CYCLES_TOTAL,
        "Total number of flush cycles in which every host failed"
    );
    describe_counter!(
        OUTPUT_FILTER_PANICS_TOTAL,
        "Total number of events discarded because a filter panicked"
    );
    describe_gauge!(
        OUTPUT_QUEUE_LENGTH,
        "Current number of messages waiting in the pending queue"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "logship daemon uptime in seconds");
    describe_gauge!(DAEMON_INPUTS_RUNNING, "Number of running inputs");
    describe_gauge!(DAEMON_OUTPUTS_RUNNING, "Number of running outputs");
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
