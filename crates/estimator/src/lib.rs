//! Cost estimator service: HTTP surface over the estimator core

pub mod api;
pub mod config;
pub mod dto;
pub mod error;
