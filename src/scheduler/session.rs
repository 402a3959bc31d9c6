//! 会话内复习队列
//!
//! 纯内存结构，承载"本次会话还没过完的词"。复习失败的词会被插回
//! 队首，在会话结束前再次出现。队列不落盘，与持久化的
//! `next_review_at` 排期互不影响，因此一次失败只产生一次降盒，
//! 不会因为会话重排而被重复惩罚。

use std::collections::VecDeque;

/// 会话内复习队列
#[derive(Debug, Default)]
pub struct ReviewSession {
    queue: VecDeque<i64>,
}

impl ReviewSession {
    /// 创建空会话
    pub fn new() -> Self {
        Self::default()
    }

    /// 用新的待复习列表替换整个会话
    pub fn replace(&mut self, ids: Vec<i64>) {
        self.queue = ids.into();
    }

    /// 取出下一个待复习的词
    pub fn next(&mut self) -> Option<i64> {
        self.queue.pop_front()
    }

    /// 把复习失败的词插回队首
    ///
    /// 若该词已在队列中，先移除旧位置，保证同一个词只出现一次。
    pub fn requeue_front(&mut self, id: i64) {
        self.queue.retain(|&queued| queued != id);
        self.queue.push_front(id);
    }

    /// 从会话中移除一个词
    pub fn remove(&mut self, id: i64) {
        self.queue.retain(|&queued| queued != id);
    }

    /// 清空会话
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// 剩余词数
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 会话是否已空
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
