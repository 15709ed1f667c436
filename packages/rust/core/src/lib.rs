//! Pipeline orchestration for rfcpub.
//!
//! This crate ties the converter and the filesystem layout together into the
//! end-to-end workflows: single-file conversion, the batch driver, status and
//! pruning, draft scaffolding, and the git sync used by CI.

pub mod pipeline;
pub mod scaffold;
pub mod status;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;
