use std::{future::IntoFuture, process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use blogcast::{
    application::{
        blogs::BlogService,
        error::AppError,
        jobs::{ScheduledPublishContext, process_scheduled_publish_job},
        repos::{BlogsRepo, BlogsWriteRepo, PublishLogRepo},
        social::{ContentFormatter, PublishOrchestrator, SocialPostService},
    },
    cache::TokenCache,
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{ApiState, build_api_router},
        social::build_social_stack,
        telemetry,
    },
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::PublishScheduled(_) => run_publish_scheduled(settings).await,
        config::Command::VerifyCredentials(args) => {
            run_verify_credentials(settings, args).await
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    let app = build_application_context(repositories, &settings)?;

    let monitor_handle = if settings.scheduler.enabled {
        Some(spawn_job_monitor(app.job_context.clone(), &settings.scheduler)?)
    } else {
        info!(
            target = "blogcast::jobs",
            "Scheduled publishing is disabled"
        );
        None
    };

    let result = serve_http(&settings, app.api_state).await;

    if let Some(handle) = monitor_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_publish_scheduled(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    let app = build_application_context(repositories, &settings)?;

    let report = app
        .job_context
        .blogs
        .publish_due_blogs(OffsetDateTime::now_utc())
        .await
        .map_err(|err| AppError::unexpected(format!("scheduled publish failed: {err}")))?;

    info!(
        target = "blogcast::publish_scheduled",
        due = report.due,
        published = ?report.published,
        rejected = ?report.rejected,
        errored = ?report.errored,
        "Scheduled publish run completed"
    );

    if report.errored.is_empty() {
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "{} scheduled blog(s) could not be processed",
            report.errored.len()
        )))
    }
}

async fn run_verify_credentials(
    settings: config::Settings,
    args: config::VerifyCredentialsArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let app = build_application_context(repositories, &settings)?;

    let check = app.api_state.social.verify_credentials(args.platform).await;
    if check.valid {
        info!(
            target = "blogcast::verify_credentials",
            platform = check.platform.as_str(),
            "Credentials are valid"
        );
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{} credentials are not usable: {}",
            check.platform,
            check.detail.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

struct ApplicationContext {
    api_state: ApiState,
    job_context: ScheduledPublishContext,
}

async fn init_repositories(
    settings: &config::Settings,
    migrate: bool,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    if migrate {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let blogs_repo: Arc<dyn BlogsRepo> = repositories.clone();
    let blogs_write_repo: Arc<dyn BlogsWriteRepo> = repositories.clone();
    let publish_logs: Arc<dyn PublishLogRepo> = repositories;

    let token_cache = Arc::new(TokenCache::new());
    let social = build_social_stack(&settings.social, token_cache).map_err(AppError::from)?;

    let orchestrator = Arc::new(PublishOrchestrator::new(
        social.resolver,
        social.publishers,
        ContentFormatter::new(settings.publishing.site_url.clone()),
        publish_logs,
        settings.publishing.publish_timeout,
    ));

    let blog_service = Arc::new(BlogService::new(
        blogs_repo.clone(),
        blogs_write_repo.clone(),
        orchestrator.clone(),
    ));
    let social_service = Arc::new(SocialPostService::new(
        blogs_repo,
        blogs_write_repo,
        orchestrator,
    ));

    Ok(ApplicationContext {
        api_state: ApiState {
            blogs: blog_service.clone(),
            social: social_service,
        },
        job_context: ScheduledPublishContext {
            blogs: blog_service,
        },
    })
}

fn spawn_job_monitor(
    context: ScheduledPublishContext,
    scheduler: &config::SchedulerSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = scheduler
        .schedule()
        .map_err(|err| AppError::from(InfraError::scheduler(err.to_string())))?;

    let scheduled_publish_worker = WorkerBuilder::new("scheduled-publish-worker")
        .data(context)
        .backend(CronStream::new(schedule))
        .build_fn(process_scheduled_publish_job);

    let monitor = Monitor::new().register(scheduled_publish_worker);

    info!(
        target = "blogcast::jobs",
        cron = %scheduler.cron,
        "Starting scheduled publish worker"
    );

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = build_api_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "blogcast::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    let drain_deadline = async move {
        if stop_rx.wait_for(|stopping| *stopping).await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline => {
            warn!(
                target = "blogcast::http",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "blogcast::http", "Shutdown signal received");
}
