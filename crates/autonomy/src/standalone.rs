//! 内存中的独立心智
//!
//! 没有外部协作方时由它执行自主任务，同时接收调度器的通知写入反思记录。

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mindforge_domain::{
    Notification, Notifier, SchedulerError, SchedulerResult, TaskContext, TaskPriority,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::mind::{task_types, GoalAction, Mind};

const SHORT_TERM_CAPACITY: usize = 50;
const REFLECTION_CAPACITY: usize = 200;
const SKILL_PRACTICE_GAIN: u32 = 5;
const MAX_PROGRESS: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub description: String,
    pub progress: u32,
    pub priority: TaskPriority,
    pub notes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.progress < MAX_PROGRESS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub content: String,
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MindState {
    goals: Vec<Goal>,
    skills: BTreeMap<String, u32>,
    short_term: VecDeque<String>,
    long_term: Vec<String>,
    reflections: VecDeque<Reflection>,
    insights: Vec<String>,
}

impl MindState {
    fn add_reflection(&mut self, content: String, kind: &str) {
        if self.reflections.len() >= REFLECTION_CAPACITY {
            self.reflections.pop_front();
        }
        self.reflections.push_back(Reflection {
            content,
            kind: kind.to_string(),
            timestamp: Utc::now(),
        });
    }
}

#[derive(Debug, Default)]
pub struct StandaloneMind {
    state: RwLock<MindState>,
}

impl StandaloneMind {
    pub fn new() -> Self {
        Self::default()
    }

    /// 带一组初始目标，便于直接运行
    pub async fn with_default_goals() -> Self {
        let mind = Self::new();
        mind.add_goal("掌握任务调度的核心技能", TaskPriority::High)
            .await;
        mind.add_goal("积累可复用的经验", TaskPriority::Medium).await;
        mind.add_goal("整理长期记忆", TaskPriority::Low).await;
        mind
    }

    pub async fn add_goal(&self, description: impl Into<String>, priority: TaskPriority) -> String {
        let goal = Goal {
            id: Uuid::new_v4().to_string(),
            description: description.into(),
            progress: 0,
            priority,
            notes: Vec::new(),
            created_at: Utc::now(),
        };
        let id = goal.id.clone();
        self.state.write().await.goals.push(goal);
        id
    }

    pub async fn goals(&self) -> Vec<Goal> {
        self.state.read().await.goals.clone()
    }

    pub async fn goal(&self, goal_id: &str) -> Option<Goal> {
        let state = self.state.read().await;
        state.goals.iter().find(|g| g.id == goal_id).cloned()
    }

    pub async fn skill(&self, name: &str) -> Option<u32> {
        self.state.read().await.skills.get(name).copied()
    }

    pub async fn add_reflection(&self, content: impl Into<String>, kind: &str) {
        self.state.write().await.add_reflection(content.into(), kind);
    }

    /// 最近的反思记录，最新的在前
    pub async fn reflections(&self, limit: usize) -> Vec<Reflection> {
        let state = self.state.read().await;
        state.reflections.iter().rev().take(limit).cloned().collect()
    }

    pub async fn insights(&self) -> Vec<String> {
        self.state.read().await.insights.clone()
    }

    pub async fn memory_sizes(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.short_term.len(), state.long_term.len())
    }

    async fn learn(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let message = context
            .param_str("message")
            .ok_or_else(|| SchedulerError::invalid_params("learn 任务缺少 message 参数"))?;
        let entry = match context.param_str("response") {
            Some(response) => format!("{message} => {response}"),
            None => message.to_string(),
        };

        let mut state = self.state.write().await;
        if state.short_term.len() >= SHORT_TERM_CAPACITY {
            state.short_term.pop_front();
        }
        state.short_term.push_back(entry);
        Ok(json!({ "learned": true, "short_term_size": state.short_term.len() }))
    }

    async fn reflect(&self) -> SchedulerResult<Value> {
        let mut state = self.state.write().await;
        let completed = state.goals.iter().filter(|g| !g.is_active()).count();

        let mut report = String::from("自我反思报告\n");
        report.push_str(&format!(
            "目标: {} 个 (已完成 {})\n已掌握技能: {} 项\n长期记忆: {} 条\n",
            state.goals.len(),
            completed,
            state.skills.len(),
            state.long_term.len()
        ));
        for goal in &state.goals {
            report.push_str(&format!(
                "  - [{}%] {} ({})\n",
                goal.progress, goal.description, goal.priority
            ));
        }

        state.add_reflection(report.clone(), "reflection");
        Ok(json!({ "reflection": report }))
    }

    async fn update_goal(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let goal_id = context
            .param_str("goal_id")
            .ok_or_else(|| SchedulerError::invalid_params("goal_update 任务缺少 goal_id 参数"))?;
        let progress = context
            .param_u64("progress")
            .ok_or_else(|| SchedulerError::invalid_params("goal_update 任务缺少 progress 参数"))?;
        let progress = progress.min(MAX_PROGRESS as u64) as u32;

        let mut state = self.state.write().await;
        let goal = state
            .goals
            .iter_mut()
            .find(|g| g.id == goal_id)
            .ok_or_else(|| SchedulerError::invalid_params(format!("目标不存在: {goal_id}")))?;

        goal.progress = progress;
        if let Some(notes) = context.param_str("notes") {
            goal.notes.push(notes.to_string());
        }
        let updated = serde_json::to_value(&*goal)?;
        let reached = !goal.is_active();
        let description = goal.description.clone();

        if reached {
            state.add_reflection(format!("目标达成: {description}"), "goal");
        }
        Ok(updated)
    }

    async fn consolidate_memory(&self) -> SchedulerResult<Value> {
        let mut state = self.state.write().await;
        let drained: Vec<String> = state.short_term.drain(..).collect();
        let consolidated = drained.len();
        state.long_term.extend(drained);
        Ok(json!({
            "consolidated": consolidated,
            "long_term_size": state.long_term.len(),
        }))
    }

    async fn practice_skill(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let skill = context
            .param_str("skill")
            .ok_or_else(|| SchedulerError::invalid_params("skill_practice 任务缺少 skill 参数"))?;

        let mut state = self.state.write().await;
        let proficiency = state.skills.entry(skill.to_string()).or_insert(0);
        *proficiency = (*proficiency + SKILL_PRACTICE_GAIN).min(MAX_PROGRESS);
        Ok(json!({ "skill": skill, "proficiency": *proficiency }))
    }

    async fn generate_insight(&self) -> SchedulerResult<Value> {
        let mut state = self.state.write().await;

        let insight = if state.goals.is_empty() && state.skills.is_empty() {
            "尚无足够的经验生成洞察".to_string()
        } else {
            let average_progress = if state.goals.is_empty() {
                0.0
            } else {
                state.goals.iter().map(|g| g.progress as f64).sum::<f64>()
                    / state.goals.len() as f64
            };
            match state.skills.iter().max_by_key(|(_, level)| **level) {
                Some((skill, level)) => format!(
                    "目标平均进度 {average_progress:.0}%，最熟练的技能是 {skill} ({level})"
                ),
                None => format!("目标平均进度 {average_progress:.0}%，还没有练习过任何技能"),
            }
        };

        state.insights.push(insight.clone());
        Ok(json!({ "insight": insight }))
    }
}

#[async_trait]
impl Mind for StandaloneMind {
    async fn next_action(&self) -> Option<GoalAction> {
        let state = self.state.read().await;
        state
            .goals
            .iter()
            .filter(|g| g.is_active())
            .min_by_key(|g| g.priority)
            .map(|g| GoalAction {
                id: g.id.clone(),
                description: g.description.clone(),
                progress: g.progress,
                priority: g.priority,
            })
    }

    async fn perform(&self, task_type: &str, context: &TaskContext) -> SchedulerResult<Value> {
        debug!(task.id = %context.task_id, task.type = task_type, "心智执行任务");
        match task_type {
            task_types::LEARN => self.learn(context).await,
            task_types::REFLECT => self.reflect().await,
            task_types::GOAL_UPDATE => self.update_goal(context).await,
            task_types::MEMORY_CONSOLIDATE => self.consolidate_memory().await,
            task_types::SKILL_PRACTICE => self.practice_skill(context).await,
            task_types::GENERATE_INSIGHT => self.generate_insight().await,
            other => Err(SchedulerError::unknown_task_type(other)),
        }
    }
}

#[async_trait]
impl Notifier for StandaloneMind {
    async fn notify(&self, notification: Notification) {
        let (content, kind) = match &notification {
            Notification::TaskCompleted(task) => (format!("任务完成: {}", task.description), "task"),
            Notification::TaskFailed(task) => (
                format!(
                    "任务失败: {} - {}",
                    task.description,
                    task.error.as_deref().unwrap_or("未知错误")
                ),
                "error",
            ),
            Notification::AlertRaised(alert) => (format!("告警: {}", alert.message), "alert"),
            Notification::FeedbackSignal { signal, record } => {
                (format!("反馈 {signal:?}: {}", record.feedback), "feedback")
            }
        };
        self.add_reflection(content, kind).await;
    }
}
