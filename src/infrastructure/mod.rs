//! Infrastructure layer - Storage backends, data sources and logging

pub mod cache;
pub mod logging;
pub mod source;
pub mod storage;
