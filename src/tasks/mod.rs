// Background loops and the in-memory registry that tracks their runs.
//
// Every loop follows the same shape: a struct owning its dependencies and
// a `start(self)` that ticks forever, recording each pass in the registry
// so operators and the API can see what ran and how it ended.

pub mod cleanup;
pub mod dispatch;
pub mod registry;
pub mod sync;
pub mod training;

pub use cleanup::CleanupTask;
pub use dispatch::NotificationDispatchTask;
pub use registry::{TaskRecord, TaskRegistry, TaskStatus};
pub use sync::OddsSyncTask;
pub use training::TrainingTask;
