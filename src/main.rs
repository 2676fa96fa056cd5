use std::{future::IntoFuture, net::SocketAddr, process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use sylheti_archive::{
    application::{
        auth::{AuthService, SessionIssuer, SignupCommand},
        contact::Mailer,
        error::AppError,
        jobs::{
            CleanupMediaViewsContext, cleanup_media_views_schedule, process_cleanup_media_views_job,
        },
        views::ViewService,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiConfig, ApiState},
        mail::{HttpMailer, LogMailer},
        telemetry,
    },
};
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
        config::Command::CleanupMediaViews(_) => run_cleanup_media_views(settings).await,
        config::Command::CreateSuperadmin(args) => run_create_superadmin(settings, args).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database_url()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_mailer(settings: &config::Settings) -> Result<Arc<dyn Mailer>, AppError> {
    match settings.mail.transport.as_ref() {
        Some(transport) => Ok(Arc::new(HttpMailer::new(transport)?)),
        None => {
            warn!(
                target = "sylheti_archive::mail",
                "mail transport not configured; contact messages will only be logged"
            );
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let mailer = build_mailer(&settings)?;
    let api_config = ApiConfig::from_settings(&settings)
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;
    let api_state = ApiState::new(repositories, mailer, api_config);

    let schedule = cleanup_media_views_schedule(&settings.scheduler.cleanup_cron)?;
    let monitor_handle = spawn_job_monitor(api_state.views.clone(), schedule);

    let result = serve_http(&settings, api_state).await;

    monitor_handle.abort();
    result
}

fn spawn_job_monitor(
    views: Arc<ViewService>,
    schedule: apalis_cron::Schedule,
) -> tokio::task::JoinHandle<()> {
    let cleanup_worker = WorkerBuilder::new("cleanup-media-views-worker")
        .data(CleanupMediaViewsContext { views })
        .backend(CronStream::new(schedule))
        .build_fn(process_cleanup_media_views_job);

    let monitor = Monitor::new().register(cleanup_worker);

    tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    })
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let mut graceful_rx = stop_rx.clone();
    let server = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = graceful_rx.wait_for(|stop| *stop).await;
    })
    .into_future();

    let grace = settings.server.graceful_shutdown;
    let mut deadline_rx = stop_rx;
    let deadline = async move {
        let _ = deadline_rx.wait_for(|stop| *stop).await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = deadline => {
            warn!(grace_seconds = grace.as_secs(), "graceful shutdown timed out; dropping open connections");
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

async fn run_cleanup_media_views(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    // Purging only compares timestamps, so the salt is irrelevant here.
    let salt = settings.views.ip_salt.clone().unwrap_or_default();
    let views = ViewService::new(repositories, salt, settings.views.retention_days.get());

    let purged = views
        .purge_expired()
        .await
        .map_err(|err| AppError::unexpected(format!("ledger cleanup failed: {err}")))?;

    info!(
        purged,
        retention_days = settings.views.retention_days.get(),
        "media view ledger cleaned"
    );
    Ok(())
}

async fn run_create_superadmin(
    settings: config::Settings,
    args: config::CreateSuperadminArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    // No token is issued here; any key satisfies the issuer.
    let secret = match settings.auth.jwt_secret.as_deref() {
        Some(secret) => secret.as_bytes().to_vec(),
        None => uuid::Uuid::new_v4().as_bytes().to_vec(),
    };
    let auth = AuthService::new(
        repositories,
        SessionIssuer::new(&secret, time::Duration::hours(1)),
    );

    let user = auth
        .bootstrap_superadmin(SignupCommand {
            username: args.username,
            email: args.email,
            password: args.password,
        })
        .await
        .map_err(|err| AppError::validation(err.to_string()))?;

    info!(
        user_id = %user.id,
        username = %user.username,
        email = %user.email,
        "superadmin created"
    );
    Ok(())
}
