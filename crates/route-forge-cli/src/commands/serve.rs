use route_forge_axum::route::AuthConfig;
use route_forge_axum::ServerEvent;

use crate::cli::{GlobalOpts, ServeArgs};
use crate::commands::build_server;
use crate::config::load_config;
use crate::error::CliError;
use crate::output::OutputContext;

/// Serves the generated routes until Ctrl-C.
pub async fn run(args: ServeArgs, global: &GlobalOpts, output: &OutputContext) -> Result<(), CliError> {
    let loaded = load_config(global.config.as_deref())?;
    let settings = loaded.server_settings();
    let mut server = build_server(&loaded, &settings.upload_dir)?;
    let mut events = server.subscribe();
    server.generate_routes()?;

    let declares_roles = server.models().iter().any(|r| !r.descriptor.roles().is_empty());
    let guarded = server
        .routes()
        .iter()
        .any(|r| r.config.auth != AuthConfig::Disabled);
    if declares_roles && !guarded {
        output.warn("models declare roles but no [auth] tokens are configured; serving without authentication");
    }

    let addr = server.start(args.bind).await?;
    output.success(&format!(
        "serving {} routes on http://{addr}{}",
        server.routes().len(),
        settings.normalized_prefix()
    ));
    output.status("Press Ctrl-C to stop.");

    let logger = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "server event");
            if matches!(event, ServerEvent::ServerStopped) {
                break;
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CliError::Other(format!("failed to listen for Ctrl-C: {e}")))?;
    output.status("Shutting down...");
    server.stop().await?;
    let _ = logger.await;
    output.success("server stopped");
    Ok(())
}
