pub mod engine;
pub mod event;
pub mod observation;
pub mod scheduler;

pub use engine::{MonitorEngine, Outcome};
pub use event::{EventKind, EventRing, MonitorEvent};
pub use observation::{Observation, Target};
pub use scheduler::{PassResult, Scheduler, SchedulerState, TargetLoader};
