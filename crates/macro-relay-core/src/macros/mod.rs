mod definition;

pub use definition::{Macro, MacroSummary, macro_id_from_name};
