//! 대기 큐 -- 직렬화된 메시지의 생산자/소비자 인계 지점
//!
//! [`PendingQueue`]는 수신 핸들러(여러 리스너 태스크)와 송신 루프(하나) 사이의
//! 유일한 공유 가변 자원입니다. 적재와 드레인 모두 같은 락 아래에서 일어나므로
//! 어떤 메시지도 두 번 관찰되거나 드레인과 비우기 사이에서 사라지지 않습니다.
//!
//! # 오버플로우 정책
//! 용량이 설정되지 않으면 무제한으로 증가합니다. 용량이 설정된 경우:
//! - [`DropPolicy::Oldest`]: 가장 오래된 메시지를 버림
//! - [`DropPolicy::Newest`]: 새 메시지를 거부

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use logship_core::config::DropPolicy;

/// 오버플로우 경고를 남기는 간격 (버린 메시지 수 기준)
const OVERFLOW_WARN_EVERY: u64 = 1_000;

struct QueueInner {
    items: VecDeque<String>,
    dropped: u64,
}

/// 출력 전송기 하나의 대기 큐
pub struct PendingQueue {
    inner: Mutex<QueueInner>,
    capacity: Option<usize>,
    drop_policy: DropPolicy,
}

impl PendingQueue {
    /// 새 대기 큐를 생성합니다. `capacity`가 `None`이면 무제한입니다.
    pub fn new(capacity: Option<usize>, drop_policy: DropPolicy) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                dropped: 0,
            }),
            capacity,
            drop_policy,
        }
    }

    /// 무제한 큐를 생성합니다.
    pub fn unbounded() -> Self {
        Self::new(None, DropPolicy::default())
    }

    // 락을 쥔 스레드가 panic해도 큐 내용은 일관적이므로 poison은 무시합니다.
    fn lock(&self) -> MutexGuard<'_, QueueInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 메시지를 적재합니다.
    ///
    /// 용량 초과로 메시지 하나가 버려지면 `true`를 반환합니다.
    pub fn push(&self, message: String) -> bool {
        let mut inner = self.lock();

        let full = self
            .capacity
            .is_some_and(|capacity| inner.items.len() >= capacity);
        if !full {
            inner.items.push_back(message);
            return false;
        }

        match self.drop_policy {
            DropPolicy::Oldest => {
                inner.items.pop_front();
                inner.items.push_back(message);
            }
            DropPolicy::Newest => {}
        }
        inner.dropped += 1;

        if inner.dropped == 1 || inner.dropped % OVERFLOW_WARN_EVERY == 0 {
            tracing::warn!(
                dropped = inner.dropped,
                capacity = ?self.capacity,
                policy = ?self.drop_policy,
                "pending queue full, dropping messages"
            );
        }
        true
    }

    /// 큐 전체를 원자적으로 꺼내고 비웁니다. 적재 순서를 유지합니다.
    pub fn drain(&self) -> Vec<String> {
        let items = std::mem::take(&mut self.lock().items);
        Vec::from(items)
    }

    /// 현재 적재된 메시지 수
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// 큐가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// 설정된 용량
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// 지금까지 용량 초과로 버린 메시지 수
    pub fn dropped_count(&self) -> u64 {
        self.lock().dropped
    }
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}
