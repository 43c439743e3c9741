pub mod gate;
pub mod types;

pub use gate::{Gate, GateOptions};
pub use types::GateOutcome;
