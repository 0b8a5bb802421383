//! Application services: blog lifecycle, social publishing pipeline and jobs.

pub mod blogs;
pub mod error;
pub mod jobs;
pub mod repos;
pub mod social;
