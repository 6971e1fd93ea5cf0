//! 호스트 라운드 로빈

/// 송신 루프 전용 호스트 순환 상태
///
/// 시도할 때마다 (성공이든 실패든) 다음 호스트로 넘어가며, 상태는 플러시 사이클 간에
/// 유지됩니다. 인덱스는 항상 `[0, len)` 범위를 유지합니다.
#[derive(Debug, Clone)]
pub struct HostRotation {
    hosts: Vec<String>,
    next: usize,
}

impl HostRotation {
    /// 호스트 목록으로 순환 상태를 만듭니다. 빈 목록이면 `None`입니다.
    pub fn new(hosts: Vec<String>) -> Option<Self> {
        if hosts.is_empty() {
            return None;
        }
        Some(Self { hosts, next: 0 })
    }

    /// 다음 시도할 호스트를 반환하고 인덱스를 전진시킵니다.
    pub fn advance(&mut self) -> &str {
        let idx = self.next;
        self.next = (self.next + 1) % self.hosts.len();
        &self.hosts[idx]
    }

    /// 다음 [`advance`](Self::advance)가 돌려줄 호스트의 인덱스
    pub fn position(&self) -> usize {
        self.next
    }

    /// 호스트 수 (한 사이클의 최대 시도 횟수)
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// 항상 `false`입니다. 빈 목록으로는 만들 수 없습니다.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// 전체 호스트 목록
    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}
