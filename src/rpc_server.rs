//! Smart Bookmark RPC Server: JSON-RPC over stdin/stdout for a UI shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"form.submit", "params":{"title":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr; stdout carries only protocol lines.

use std::io;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, subscriber::set_global_default};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use smart_bookmark::app::App;
use smart_bookmark::rpc_handler::handle_method;
use smart_bookmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use smart_bookmark::types::settings::LoggingSettings;

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = Registry::default()
        .with(
            fmt::Layer::default()
                .compact()
                .with_ansi(settings.ansi)
                .with_writer(io::stderr),
        )
        .with(filter);
    if let Err(e) = set_global_default(subscriber) {
        eprintln!("failed to install log subscriber: {}", e);
    }
}

async fn write_line(stdout: &mut tokio::io::Stdout, value: &Value) -> io::Result<()> {
    let mut line = value.to_string();
    line.push('\n');
    stdout.write_all(line.as_bytes()).await?;
    stdout.flush().await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::var("SMART_BOOKMARK_CONFIG").ok();
    let mut settings_engine = SettingsEngine::new(config_path);
    let settings = match settings_engine.load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}; using defaults", e);
            Default::default()
        }
    };
    init_logging(&settings.logging);

    let mut app = App::new(settings_engine)?;
    app.refresh().await;

    let mut stdout = tokio::io::stdout();
    write_line(
        &mut stdout,
        &json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}),
    )
    .await?;
    info!("ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                let response = json!({"id": null, "error": format!("parse error: {}", e)});
                write_line(&mut stdout, &response).await?;
                continue;
            }
        };

        let id = req.get("id").cloned().unwrap_or(Value::Null);
        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&mut app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => {
                error!(method, error = %err, "request failed");
                json!({"id": id, "error": err})
            }
        };
        write_line(&mut stdout, &response).await?;
    }

    app.shutdown();
    info!("stdin closed, exiting");
    Ok(())
}
