// src/lib.rs

//! Harvester: a paginated, date-bounded crawl engine for group messages and
//! participants, writing GZIP Parquet partitions to local disk or S3.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod source;
pub mod storage;
pub mod utils;
