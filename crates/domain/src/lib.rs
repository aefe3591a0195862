pub mod entities;
pub mod events;
pub mod ports;
pub mod value_objects;

pub use entities::*;
pub use events::*;
pub use mindforge_errors::{SchedulerError, SchedulerResult};
pub use ports::*;
pub use value_objects::*;
