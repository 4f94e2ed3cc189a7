mod context;
mod model;

pub use context::{ErrorContext, ResultExt};
pub use model::{ErrorCode, ExitCode, MachineError};
