pub mod command;
pub mod interrupt;

// Trait-based abstraction for testability
pub mod executor;

pub use command::{CommandError, CommandSpec};
pub use executor::{CommandExecutor, RealExecutor};
pub use interrupt::Interrupt;
