#![forbid(unsafe_code)]

pub mod config;
pub mod monitor;
pub mod notify;
pub mod probe;
pub mod store;

pub use config::MonitorConfig;
pub use monitor::{
    EventKind, EventRing, MonitorEngine, MonitorEvent, Observation, Outcome, PassResult,
    Scheduler, SchedulerState, Target, TargetLoader,
};
pub use notify::{Notifier, NotifyError, NullNotifier, TelegramNotifier};
pub use probe::{HttpProbe, Probe, ProbeError, ProbeRegistry};
pub use store::{JsonlStore, MemoryStore, StateStore, StoreError};
