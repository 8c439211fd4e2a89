#[macro_use]
extern crate tracing;

use std::sync::Arc;

use anyhow::Context;
use runtime::utils::format_error_disp;

mod config;
mod routes;


#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Some(options) = config::parse_options(std::env::args())? else {
        return Ok(());
    };
    runtime::log::setup_logger("editor_api")?;

    let config = options.resolve().context("Loading configuration failed")?;
    info!(bind = %config.bind, locale = %config.locale, "starting editor-api");

    let bind = config.bind;
    let app = Arc::new(routes::App::new(&config));
    let router = routes::router(Arc::clone(&app));

    let tasks = vec![
        ("web server", runtime::task(move |cancel| async move {
            if let Err(e) = runtime_axum::server::run_server(cancel, bind, router).await {
                error!("web server failed: {}", format_error_disp(&e));
            }
        })),
    ];

    runtime::run(runtime::RunHandle::new(), tasks, move || {
        match options.resolve() {
            Ok(config) => {
                if config.bind != bind {
                    warn!("bind address changed to {}, restart to apply", config.bind);
                }
                app.apply(&config);
            },
            Err(e) => error!("keeping previous settings: {}", format_error_disp(&e)),
        }
    }).await?;

    Ok(())
}
