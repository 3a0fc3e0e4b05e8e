// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-XhsPublisher-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of xhs-publisher and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! xhs-publisher CLI entrypoint.
//!
//! By default this serves MCP over stdio. With `--mcp-http-port` (or `XHS_MCP_HTTP_PORT`) it
//! serves streamable HTTP at `http://127.0.0.1:<port>/mcp` instead.

use std::error::Error;
use std::sync::Arc;

use axum::Router;
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, StreamableHttpServerConfig,
    StreamableHttpService,
};
use xhs_publisher::config::{self, Settings};
use xhs_publisher::dispatch::PublishDispatcher;
use xhs_publisher::mcp::XhsMcp;
use xhs_publisher::platform::HttpConnector;
use xhs_publisher::session::SessionManager;
use xhs_publisher::stage::ResourceStager;
use xhs_publisher::store::CookieStore;
use xhs_publisher::telemetry;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [options]\n\nOptions:\n  --config <file>          JSON config file (XHS_CONFIG)\n  --account <name>         account whose cookie is used (XHS_ACCOUNT, default `default`)\n  --cookie-dir <dir>       cookie directory (XHS_COOKIE_DIR, default {cookie_dir})\n  --log-level <filter>     log filter (XHS_LOG_LEVEL, default {log_level}; RUST_LOG wins)\n  --log-file <file>        append logs to a file instead of stderr (XHS_LOG_FILE)\n  --sign-url <url>         request signing service (XHS_SIGN_URL)\n  --no-sign                disable request signing (XHS_USE_SIGN=false)\n  --login-method <method>  `qrcode` or `phone` (XHS_LOGIN_METHOD)\n  --phone <number>         default phone for phone login (XHS_PHONE)\n  --area-code <code>       default area code (XHS_AREA_CODE, default {area_code})\n  --durable-writes         fsync cookie files after writing (XHS_DURABLE_WRITES)\n  --mcp-http-port <port>   serve streamable HTTP at http://127.0.0.1:<port>/mcp instead of stdio\n                           (XHS_MCP_HTTP_PORT, 0 = ephemeral)\n  -h, --help               show this help",
        cookie_dir = config::DEFAULT_COOKIE_DIR,
        log_level = config::DEFAULT_LOG_LEVEL,
        area_code = config::DEFAULT_AREA_CODE,
    );
}

async fn build_server(settings: &Settings) -> Result<XhsMcp, Box<dyn Error>> {
    let store = CookieStore::new(&settings.cookie_dir).with_durability(settings.durability());
    let connector = HttpConnector::new(settings.effective_sign_url())?;
    if !connector.signs_requests() {
        tracing::warn!("request signing is disabled; the platform may reject write calls");
    }
    let session = SessionManager::open(settings.account.clone(), store, Arc::new(connector)).await;
    let stager = ResourceStager::new(std::env::temp_dir())?;
    Ok(XhsMcp::new(
        Arc::new(session),
        PublishDispatcher::new(stager),
        settings.login.clone(),
    ))
}

async fn serve_http(mcp: XhsMcp, port: u16) -> Result<(), Box<dyn Error>> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "serving MCP over streamable HTTP at /mcp");

    let config = StreamableHttpServerConfig {
        stateful_mode: true,
        ..StreamableHttpServerConfig::default()
    };
    let shutdown_token = config.cancellation_token.clone();

    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config);
    let router = Router::new().nest_service("/mcp", mcp_service);

    tokio::spawn({
        let shutdown_token = shutdown_token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutting down");
            }
            shutdown_token.cancel();
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_token.cancelled().await;
        })
        .await?;
    Ok(())
}

async fn run(settings: Settings) -> Result<(), Box<dyn Error>> {
    let mcp = build_server(&settings).await?;
    match settings.mcp_http_port {
        Some(port) => serve_http(mcp, port).await,
        None => {
            mcp.serve_stdio().await?;
            Ok(())
        }
    }
}

fn main() {
    let result = (|| -> Result<(), Box<dyn Error>> {
        let mut args = std::env::args();
        let program = args.next().unwrap_or_else(|| "xhs-publisher".to_owned());

        let options = match config::parse_options(args) {
            Ok(options) if options.help => {
                print_usage(&program);
                return Ok(());
            }
            Ok(options) => options,
            Err(()) => {
                print_usage(&program);
                std::process::exit(2);
            }
        };

        let settings = config::from_env(options)?;
        telemetry::init(&settings)?;
        tracing::info!(
            account = %settings.account,
            cookie_dir = %settings.cookie_dir.display(),
            login_method = %settings.login.method,
            "starting xhs-publisher"
        );

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(run(settings))
    })();

    if let Err(err) = result {
        tracing::error!(error = %err, "exiting");
        eprintln!("xhs-publisher: {err}");
        std::process::exit(1);
    }
}
