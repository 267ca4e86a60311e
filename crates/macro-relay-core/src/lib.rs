//! Macro-relay Core Library
//!
//! Records keyboard and mouse input as macros, persists them as flat JSON
//! files and plays them back with optional timing fidelity.
//!
//! # Example
//!
//! ```no_run
//! use macro_relay_core::{
//!     Command, CoreResult, EnigoInjector, Macro, MacroExecutor, MacroStore, NamedKey,
//! };
//!
//! fn main() -> CoreResult<()> {
//!     let store = MacroStore::open("macros")?;
//!     let greeting = Macro::new(
//!         "Say hello",
//!         "Types a greeting",
//!         vec![
//!             Command::text("hello", 0.0),
//!             Command::key(NamedKey::Enter, true, 0.1),
//!             Command::key(NamedKey::Enter, false, 0.15),
//!         ],
//!         1,
//!         0,
//!         true,
//!     );
//!     store.save(&greeting, true)?;
//!
//!     let mut injector = EnigoInjector::new()?;
//!     let outcome = MacroExecutor::new(store.load("Say_hello")?).execute(&mut injector)?;
//!
//!     println!("Finished: {:?}", outcome);
//!     Ok(())
//! }
//! ```

mod command;
mod engine;
mod error;
mod input;
mod macros;
mod recorder;
mod store;

pub use {
    command::{
        Command, CommandKind, CommandRecord, CommandUpdate, KNOWN_KINDS, KeyRef, KeyValue,
        MouseButton, NamedKey, RecordBody,
    },
    engine::{ExecutionHandle, ExecutionOutcome, HeldInputs, MacroExecutor},
    error::{CoreError, Result as CoreResult},
    input::{
        EnigoInjector, InputChannel, InputHub, InputInjector, KeyboardInjector, MouseInjector,
        RawInputEvent, SubscriptionId, system_hub,
    },
    macros::{Macro, MacroSummary, macro_id_from_name},
    recorder::{Recorder, RecorderChannel, RecorderOptions, RecorderStatus},
    store::MacroStore,
};

#[cfg(test)]
mod tests;
