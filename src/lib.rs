//! Mirrors the daily broadcast monitoring reports of an ACRCloud stream into
//! ownCloud and MinIO, fetching only the days a backend does not have yet.
pub mod backfill;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod gap;
pub mod interval;
pub mod job;
pub mod source;
pub mod storage;

#[cfg(test)]
mod fakes;
