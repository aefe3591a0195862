pub mod handlers;
pub mod queue;
pub mod registry;
pub mod scheduler;

pub use handlers::{register_builtin_handlers, EchoHandler, NoopHandler, SleepHandler};
pub use queue::PendingQueue;
pub use registry::HandlerRegistry;
pub use scheduler::TaskScheduler;
