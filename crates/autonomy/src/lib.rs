//! 自主执行层：心智协作方接口、定时驱动以及组装好的执行引擎

pub mod driver;
pub mod engine;
pub mod mind;
pub mod standalone;

pub use driver::{AutonomousDriver, TickReport};
pub use engine::{AutonomousEngine, EngineStatus, FanoutNotifier};
pub use mind::{register_mind_handlers, task_types, GoalAction, Mind, MindHandler};
pub use standalone::{Goal, Reflection, StandaloneMind};
