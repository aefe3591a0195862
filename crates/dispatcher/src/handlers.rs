//! 内置处理器

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mindforge_domain::{SchedulerError, SchedulerResult, TaskContext, TaskHandler};
use serde_json::{json, Value};

use crate::registry::HandlerRegistry;

/// 立即成功
pub struct NoopHandler;

#[async_trait]
impl TaskHandler for NoopHandler {
    async fn handle(&self, _context: &TaskContext) -> SchedulerResult<Value> {
        Ok(Value::Null)
    }

    fn name(&self) -> &str {
        "noop"
    }

    fn description(&self) -> &str {
        "立即完成，不做任何处理"
    }
}

/// 等待 `params.duration_ms` 毫秒后成功
pub struct SleepHandler;

#[async_trait]
impl TaskHandler for SleepHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        let duration_ms = context
            .param_u64("duration_ms")
            .ok_or_else(|| SchedulerError::invalid_params("sleep 任务缺少 duration_ms 参数"))?;
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        Ok(json!({ "slept_ms": duration_ms }))
    }

    fn name(&self) -> &str {
        "sleep"
    }

    fn description(&self) -> &str {
        "按 duration_ms 参数休眠"
    }
}

/// 原样返回任务参数
pub struct EchoHandler;

#[async_trait]
impl TaskHandler for EchoHandler {
    async fn handle(&self, context: &TaskContext) -> SchedulerResult<Value> {
        Ok(serde_json::to_value(&context.params)?)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "返回任务参数"
    }
}

pub async fn register_builtin_handlers(registry: &HandlerRegistry) {
    registry.register("noop", Arc::new(NoopHandler)).await;
    registry.register("sleep", Arc::new(SleepHandler)).await;
    registry.register("echo", Arc::new(EchoHandler)).await;
}
