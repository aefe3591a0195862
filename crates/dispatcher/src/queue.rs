use std::collections::{BTreeMap, HashMap};

use mindforge_domain::{Task, TaskId, TaskPriority};

type QueueKey = (TaskPriority, u64);

/// 按 (优先级, 到达序号) 排序的待执行队列
///
/// 重试的任务保留原有序号，重新入队后回到原来的位置。
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: BTreeMap<QueueKey, Task>,
    index: HashMap<TaskId, QueueKey>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        let key = (task.priority, task.sequence);
        self.index.insert(task.id, key);
        self.entries.insert(key, task);
    }

    /// 取出优先级最高、序号最小的任务
    pub fn pop_next(&mut self) -> Option<Task> {
        let (_, task) = self.entries.pop_first()?;
        self.index.remove(&task.id);
        Some(task)
    }

    pub fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let key = self.index.remove(id)?;
        self.entries.remove(&key)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.index.get(id).and_then(|key| self.entries.get(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按出队顺序排列的快照
    pub fn snapshot(&self) -> Vec<Task> {
        self.entries.values().cloned().collect()
    }
}
