//! channel-link-server

use anyhow::{anyhow, Context, Result};
use axum::{routing::get, Router};
use axum_server::Handle;
use channel_link_server::{
    app_state::{AppState, AppStateBuilder},
    db,
    docs::ApiDoc,
    extract::signature::{InteractionKey, SIGNATURE_HEADER},
    metrics::setup_metrics_recorder,
    middleware::runtime,
    router,
    routes::fallback::notfound_404,
    settings::{AppEnvironment, Server, Settings},
    setups::{
        local::{LocalAttributeStore, LocalSetup},
        prod::{PgCodeStore, ProdSetup, UserPoolAttributeStore},
        ServerSetup,
    },
};
use clap::Parser;
use http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;
use std::{
    future::ready,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    process::exit,
    time::Duration,
};
use tokio::signal::{
    self,
    unix::{signal, SignalKind},
};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer, request_id::MakeRequestUuid,
    sensitive_headers::SetSensitiveHeadersLayer, timeout::TimeoutLayer, trace::TraceLayer,
    ServiceBuilderExt,
};
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Request identifier field.
const REQUEST_ID: &str = "x-request-id";

/// Log filter used when `RUST_LOG` isn't set
const DEFAULT_LOG_FILTER: &str = "channel_link_server=info,tower_http=info,reqwest_retry=info";

/// Binds messaging channels to identities by redeeming verification codes
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the settings file. Defaults to the bundled config/settings.toml
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config)?;

    let (stdout_writer, _stdout_guard) = tracing_appender::non_blocking(io::stdout());
    setup_tracing(stdout_writer, settings.server.environment);

    info!(
        subject = "app_settings",
        category = "init",
        "starting with settings: {:?}",
        settings,
    );

    db::migrations::run(&settings.database.url).await?;

    let db_pool = db::pool(&settings.database.url, settings.database.connect_timeout).await?;
    let code_store = PgCodeStore::new(db_pool);

    let interaction_key = InteractionKey::from_hex(&settings.interactions.public_key)
        .context("Invalid interactions.public_key")?;

    let recorder_handle = setup_metrics_recorder()?;
    let cancellation_token = CancellationToken::new();

    let metrics_server = tokio::spawn(serve_metrics(
        recorder_handle,
        settings.server.metrics_port,
        cancellation_token.clone(),
    ));

    let app_server = match settings.server.environment {
        AppEnvironment::Local => {
            let app_state = AppStateBuilder::<LocalSetup>::default()
                .with_code_store(code_store)
                .with_attribute_store(LocalAttributeStore::new())
                .with_channel_attribute(&settings.identity_pool.channel_attribute)
                .with_interaction_key(interaction_key)
                .finalize()?;

            tokio::spawn(serve_app(
                app_state,
                settings.server.clone(),
                cancellation_token.clone(),
            ))
        }
        _ => {
            let attribute_store = UserPoolAttributeStore::new(&settings.identity_pool)?;
            let app_state = AppStateBuilder::<ProdSetup>::default()
                .with_code_store(code_store)
                .with_attribute_store(attribute_store)
                .with_channel_attribute(&settings.identity_pool.channel_attribute)
                .with_interaction_key(interaction_key)
                .finalize()?;

            tokio::spawn(serve_app(
                app_state,
                settings.server.clone(),
                cancellation_token.clone(),
            ))
        }
    };

    tokio::spawn(async move {
        capture_sigterm().await;

        cancellation_token.cancel();
        println!("\nCtrl+C received, shutting down. Press Ctrl+C again to force shutdown.");

        capture_sigterm().await;

        exit(130)
    });

    let (metrics, app) = tokio::try_join!(metrics_server, app_server)?;

    if let Err(e) = metrics {
        error!("metrics server crashed: {e:#}");
    }

    if let Err(e) = app {
        error!("app server crashed: {e:#}");
    }

    Ok(())
}

async fn serve_metrics(
    recorder_handle: PrometheusHandle,
    port: u16,
    token: CancellationToken,
) -> Result<()> {
    let metrics_router = Router::new()
        .route("/metrics", get(move || ready(recorder_handle.render())))
        .fallback(notfound_404);

    let router = metrics_router.layer(CatchPanicLayer::custom(runtime::catch_panic));

    let (server, _) = serve("Metrics", router, port).await?;

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

async fn serve_app<S: ServerSetup>(
    app_state: AppState<S>,
    settings: Server,
    token: CancellationToken,
) -> Result<()> {
    let req_id = HeaderName::from_static(REQUEST_ID);

    let router = router::setup_app_router(app_state)
        .layer(TraceLayer::new_for_http())
        // Set and propagate "x-request-id" (as a uuid) per request.
        .layer(
            ServiceBuilder::new()
                .set_request_id(req_id.clone(), MakeRequestUuid)
                .propagate_request_id(req_id),
        )
        // Applies the `tower_http::timeout::Timeout` middleware which
        // applies a timeout to requests.
        .layer(TimeoutLayer::new(Duration::from_millis(settings.timeout_ms)))
        // Catches runtime panics and converts them into
        // `500 Internal Server` responses.
        .layer(CatchPanicLayer::custom(runtime::catch_panic))
        // Mark headers as sensitive on both requests and responses.
        .layer(SetSensitiveHeadersLayer::new([HeaderName::from_static(
            SIGNATURE_HEADER,
        )]))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let (server, _) = serve("Application", router, settings.port).await?;

    token.cancelled().await;
    server.graceful_shutdown(None);

    Ok(())
}

async fn serve(name: &str, app: Router, port: u16) -> Result<(Handle, SocketAddr)> {
    let bind_addr: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    info!(
        subject = "app_start",
        category = "init",
        "{} server listening on {}",
        name,
        bind_addr
    );

    let handle = Handle::new();

    tokio::spawn({
        let handle = handle.clone();
        async move {
            axum_server::bind(bind_addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    });

    let addr = handle
        .listening()
        .await
        .ok_or_else(|| anyhow!("{name} server failed to bind {bind_addr}"))?;

    Ok((handle, addr))
}

/// Captures and waits for system signals.
async fn capture_sigterm() {
    #[cfg(unix)]
    let term = async {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let term = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        _ = term => {}
    };
}

/// Setup the [tracing][tracing] subscriber.
///
/// Logs are JSON formatted everywhere but in local environments.
fn setup_tracing(writer: tracing_appender::non_blocking::NonBlocking, environment: AppEnvironment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    let format = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true);

    if environment == AppEnvironment::Local {
        registry.with(format).init();
    } else {
        registry.with(format.json()).init();
    }
}
