use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("未知任务类型: {0}")]
    UnknownTaskType(String),
    #[error("任务执行错误: {0}")]
    TaskExecution(String),
    #[error("任务处理器异常退出: {0}")]
    HandlerPanic(String),
    #[error("任务执行超时: {timeout_ms}ms")]
    ExecutionTimeout { timeout_ms: u64 },
    #[error("任务未找到: {id}")]
    TaskNotFound { id: String },
    #[error("无效的任务参数: {0}")]
    InvalidTaskParams(String),
    #[error("数据验证失败: {0}")]
    ValidationError(String),
    #[error("配置错误: {0}")]
    Configuration(String),
    #[error("序列化错误: {0}")]
    Serialization(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    pub fn unknown_task_type<S: Into<String>>(task_type: S) -> Self {
        Self::UnknownTaskType(task_type.into())
    }
    pub fn task_not_found<S: Into<String>>(id: S) -> Self {
        Self::TaskNotFound { id: id.into() }
    }
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        Self::TaskExecution(msg.into())
    }
    pub fn invalid_params<S: Into<String>>(msg: S) -> Self {
        Self::InvalidTaskParams(msg.into())
    }
    pub fn config_error<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }
    pub fn validation_error<S: Into<String>>(msg: S) -> Self {
        Self::ValidationError(msg.into())
    }

    /// 配置类错误重试也不会成功，直接进入终态
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            SchedulerError::UnknownTaskType(_) | SchedulerError::Configuration(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SchedulerError::Internal(_))
    }

    pub fn user_message(&self) -> &str {
        match self {
            SchedulerError::UnknownTaskType(_) => "没有为该任务类型注册处理器",
            SchedulerError::TaskNotFound { .. } => "请求的任务不存在",
            SchedulerError::InvalidTaskParams(_) => "任务参数配置有误",
            SchedulerError::ValidationError(_) => "输入数据验证失败",
            SchedulerError::ExecutionTimeout { .. } => "任务执行超时，将按重试策略处理",
            _ => "系统繁忙，请稍后重试",
        }
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for SchedulerError {
    fn from(err: anyhow::Error) -> Self {
        SchedulerError::Internal(err.to_string())
    }
}
