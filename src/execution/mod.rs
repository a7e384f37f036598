//! Scenario execution engine
//!
//! [`SpecExecutor`] deals scenarios out to streams; on each stream a
//! [`ScenarioExecutor`] runs one scenario at a time against that stream's
//! runner, walking the step tree and filling in the result tree.

mod dispatch;
mod hooks;
pub mod manual;
mod scenario;
pub mod spec;
mod step;

#[cfg(test)]
pub(crate) mod testing;

pub use manual::{manual_execution_eligible, ManualConsole};
pub use scenario::ScenarioExecutor;
pub use spec::SpecExecutor;
