//! 端口定义
//!
//! 调度核心与外部协作方之间的接口

pub mod handler;
pub mod metrics;
pub mod notifier;

pub use handler::*;
pub use metrics::*;
pub use notifier::*;
