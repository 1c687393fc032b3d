//! 整页翻译互斥门
//!
//! 单槽位的比较交换门：同一时间最多一个整页翻译在运行，后来的请求直接返回。

use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;

#[derive(Debug, Default)]
pub struct PassGate {
    state: AtomicU8,
}

impl PassGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试进入；已有翻译在运行时返回 `None`
    pub fn try_acquire(&self) -> Option<PassPermit<'_>> {
        self.state
            .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassPermit { gate: self })
    }

    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }
}

/// 持有期间门处于占用状态，释放时自动复位
#[derive(Debug)]
pub struct PassPermit<'a> {
    gate: &'a PassGate,
}

impl Drop for PassPermit<'_> {
    fn drop(&mut self) {
        self.gate.state.store(IDLE, Ordering::Release);
    }
}
