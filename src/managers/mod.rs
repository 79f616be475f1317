pub mod logging;
pub mod registry;
pub mod run;
pub mod stats;
