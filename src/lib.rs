//! Blog publishing backend that syndicates articles to Facebook, Instagram
//! and LinkedIn.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
