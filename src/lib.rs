//! Library entry for meccabbs components used by binary and tests.

pub mod bbs;
pub mod config;
pub mod logutil;
pub mod mecca;
pub mod metrics;
