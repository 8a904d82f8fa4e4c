use route_forge_axum::route::{AuthConfig, HandlerRef};
use route_forge_axum::RouteDescriptor;

use crate::cli::{GlobalOpts, RoutesArgs};
use crate::commands::build_server;
use crate::config::load_config;
use crate::error::CliError;
use crate::output::{OutputContext, OutputMode};

pub fn run(args: RoutesArgs, global: &GlobalOpts, output: &OutputContext) -> Result<(), CliError> {
    let loaded = load_config(global.config.as_deref())?;
    let settings = loaded.server_settings();
    let mut server = build_server(&loaded, &settings.upload_dir)?;

    if let Some(name) = &args.model {
        if !server
            .models()
            .iter()
            .any(|r| r.descriptor.name().as_str() == name)
        {
            return Err(CliError::ModelNotFound { name: name.clone() });
        }
    }

    server.generate_routes()?;
    let routes: Vec<&RouteDescriptor> = server
        .routes()
        .iter()
        .filter(|route| selected(route, args.model.as_deref()))
        .collect();

    match output.mode {
        OutputMode::Json => {
            let docs: Vec<serde_json::Value> = routes.iter().map(|r| r.documentation()).collect();
            output.print_json(&serde_json::Value::Array(docs));
        }
        OutputMode::Plain => {
            for route in &routes {
                println!(
                    "{}\t{}\t{}",
                    route.method,
                    route.path,
                    auth_label(&route.config.auth)
                );
            }
        }
        OutputMode::Human => {
            print!("{}", render_table(&routes));
            output.status(&format!("{} routes", routes.len()));
        }
    }
    Ok(())
}

/// Model routes match the filter by name; the CSRF route only shows
/// unfiltered.
fn selected(route: &RouteDescriptor, model: Option<&str>) -> bool {
    match (model, &route.handler) {
        (None, _) => true,
        (Some(name), HandlerRef::Model { model, .. }) => model.as_str() == name,
        (Some(_), HandlerRef::CsrfToken) => false,
    }
}

fn auth_label(auth: &AuthConfig) -> String {
    match auth {
        AuthConfig::Disabled => "-".to_string(),
        AuthConfig::Required {
            strategy,
            scope: None,
        } => strategy.clone(),
        AuthConfig::Required {
            strategy,
            scope: Some(scope),
        } => format!("{strategy}:{scope}"),
    }
}

fn render_table(routes: &[&RouteDescriptor]) -> String {
    let rows: Vec<[String; 4]> = routes
        .iter()
        .map(|r| {
            [
                r.method.to_string(),
                r.path.clone(),
                auth_label(&r.config.auth),
                r.config.description.clone(),
            ]
        })
        .collect();
    let header = ["METHOD", "PATH", "AUTH", "DESCRIPTION"].map(String::from);

    let mut widths = header.clone().map(|h| h.len());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    for row in std::iter::once(&header).chain(&rows) {
        let line = format!(
            "{:<w0$}  {:<w1$}  {:<w2$}  {}",
            row[0],
            row[1],
            row[2],
            row[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
