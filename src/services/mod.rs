// Skrivpartner Core Services

pub mod composer;
pub mod config_store;
pub mod presenter;
pub mod providers;
pub mod session;
pub mod writing_policy;

#[cfg(test)]
pub(crate) mod testing;

pub use composer::*;
pub use config_store::*;
pub use presenter::*;
pub use providers::*;
pub use session::*;
pub use writing_policy::*;
