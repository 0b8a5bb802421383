pub mod credentials;
pub mod formatter;
pub mod orchestrator;
pub mod outcome;
pub mod posts;
pub mod publisher;
pub mod reconciler;

pub use credentials::{
    CredentialError, CredentialResolver, StaticTokenSource, TokenSource, usable_token,
};
pub use formatter::{ContentFormatter, PostContent, format_post, strip_html};
pub use orchestrator::{METRIC_PUBLISH_ATTEMPT, PublishDecision, PublishError, PublishOrchestrator};
pub use outcome::{AttemptResult, FailureKind, PublishAttempt, PublishOutcome};
pub use posts::{CredentialCheck, DeletedPost, RepublishResult, SocialPostError, SocialPostService};
pub use publisher::{
    GRAPH_INVALID_TOKEN_CODE, PlatformPublisher, PostsPage, PublishContent, PublishReceipt,
    PublisherError, PublisherRegistry, RemotePost,
};
pub use reconciler::BlogStatusReconciler;
