mod executor;

pub use executor::{ExecutionHandle, ExecutionOutcome, HeldInputs, MacroExecutor};
