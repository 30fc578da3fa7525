//! citesync - operational transformation for collaborative citation editing
//!
//! - [`ot`]: pure transforms over text, citation and cursor operations
//! - [`collab`]: the apply pipeline, stores, permissions and events
//! - [`cli`]: developer commands

pub mod cli;
pub mod collab;
pub mod ot;
