//! # pipeweave-pipeline
//!
//! Concrete pipeline plugins built on the core runner and backend seam:
//! single-backend sequencing, dual-backend review, live streaming with a
//! follow-up pass, and search-augmented part-number lookup.

pub mod chat;
pub mod dual;
pub mod live;
pub mod part_lookup;

pub use chat::ChatPipeline;
pub use dual::DualBackendPipeline;
pub use live::LiveStreamPipeline;
pub use part_lookup::{PartLookupPipeline, ProductSelector};
