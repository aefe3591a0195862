pub mod app_config;
pub mod autonomy;
pub mod logging;
pub mod monitor;
pub mod scheduler;

pub use app_config::*;
pub use autonomy::*;
pub use logging::*;
pub use monitor::*;
pub use scheduler::*;
