mod service;
pub mod types;

pub use service::BlogService;
pub use types::{BlogChange, BlogError, CreateBlogCommand, SweepReport, UpdateBlogCommand};
