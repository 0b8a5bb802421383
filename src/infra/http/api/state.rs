use std::sync::Arc;

use crate::application::blogs::BlogService;
use crate::application::social::SocialPostService;

#[derive(Clone)]
pub struct ApiState {
    pub blogs: Arc<BlogService>,
    pub social: Arc<SocialPostService>,
}
