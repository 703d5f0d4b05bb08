use intentbox::config::Config;
use intentbox::dispatch::{DispatchError, Dispatcher};
use intentbox::engine::ChannelCallback;
use intentbox::intent::Payload;
use intentbox::{HandlerRegistry, Intent, IntentError, Pipeline, ResultType};
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{info, warn};

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Where and how the CLI prints results
pub struct Output {
    json: bool,
    captured: Option<Mutex<Vec<String>>>,
}

impl Output {
    pub fn stdout(json: bool) -> Self {
        Self {
            json,
            captured: None,
        }
    }

    #[cfg(test)]
    fn captured(json: bool) -> Self {
        Self {
            json,
            captured: Some(Mutex::new(Vec::new())),
        }
    }

    fn emit(&self, line: String) {
        match &self.captured {
            Some(lines) => lines.lock().push(line),
            None => println!("{line}"),
        }
    }

    /// Pretty JSON when `--json` was given, otherwise the plain rendering
    fn render<T: serde::Serialize>(
        &self,
        result_type: ResultType,
        value: &T,
        plain: impl FnOnce() -> String,
    ) -> Result<(), DispatchError> {
        if !self.json {
            self.emit(plain());
            return Ok(());
        }
        self.emit_json(result_type, value)
    }

    fn emit_json<T: serde::Serialize>(
        &self,
        result_type: ResultType,
        value: &T,
    ) -> Result<(), DispatchError> {
        let rendered = serde_json::to_string_pretty(value)
            .map_err(|e| DispatchError::ConsumerFailed {
                result_type,
                reason: e.to_string(),
            })?;
        self.emit(rendered);
        Ok(())
    }
}

pub fn load_config(path: Option<PathBuf>) -> Result<Config, intentbox::config::ConfigError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

pub async fn open(config: Config, args: crate::cli::OpenArgs) -> CommandResult {
    let (pipeline, ctx) = Pipeline::from_config(&config, HandlerRegistry::with_defaults())?;

    let intent = Intent::builder()
        .uri(args.uri)
        .maybe_content_type(args.content_type)
        .maybe_required_return_type(args.require)
        .maybe_expected_return_type(args.expect)
        .maybe_explicit_handler(args.handler)
        .metadata(args.meta.into_iter().collect())
        .build();

    let (callback, rx) = ChannelCallback::channel();
    let submission = pipeline.submit(intent, callback, &ctx);
    info!(intent_id = %submission.id(), "Intent submitted");

    let interrupt = tokio::spawn({
        let submission = submission.clone();
        async move {
            shutdown_signal().await;
            submission.cancel();
        }
    });
    let completion = rx.await;
    interrupt.abort();
    let completion = completion?;

    let payload = match completion.result {
        Ok(payload) => payload,
        Err(IntentError::Cancelled) => {
            info!("Cancelled");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    printer().dispatch(&payload, &completion.intent, &Output::stdout(args.json))?;
    Ok(())
}

pub fn routes(config: Config) -> CommandResult {
    let (pipeline, _ctx) = Pipeline::from_config(&config, HandlerRegistry::with_defaults())?;

    println!(
        "{:>8}  {:<20} {:<10} {:<9} MATCHES",
        "PRIORITY", "FILTER", "HANDLER", "PRODUCES"
    );
    for entry in pipeline.filters().filters().iter() {
        let filter = entry.item();
        let mut matches: Vec<String> = filter
            .content_types()
            .iter()
            .map(ToString::to_string)
            .collect();
        if let Some(pattern) = filter.uri_pattern() {
            matches.push(format!("/{}/", pattern.as_str()));
        }
        println!(
            "{:>8}  {:<20} {:<10} {:<9} {}",
            filter.priority(),
            filter.name(),
            filter.handler(),
            filter.produces().to_string(),
            matches.join(" ")
        );
    }

    Ok(())
}

/// Consumers for every built-in result type, plus a JSON fallback for
/// custom results
fn printer() -> Dispatcher<Output> {
    let dispatcher = Dispatcher::new();

    dispatcher.register_consumer(ResultType::Text, |payload, _, output: &Output| {
        let Some(text) = payload.as_text() else {
            return Ok(());
        };
        output.render(ResultType::Text, &text, || text.to_string())
    });

    dispatcher.register_consumer(ResultType::Bytes, |payload, intent, output: &Output| {
        let Payload::Bytes(bytes) = payload else {
            return Ok(());
        };
        let summary = serde_json::json!({ "uri": intent.uri(), "size": bytes.len() });
        output.render(ResultType::Bytes, &summary, || {
            format!("{}: {} bytes", intent.uri(), bytes.len())
        })
    });

    dispatcher.register_consumer(ResultType::Layer, |payload, _, output: &Output| {
        let Some(layer) = payload.as_layer() else {
            return Ok(());
        };
        output.render(ResultType::Layer, layer, || {
            let mut lines = vec![format!(
                "layer '{}' ({}) <- {}",
                layer.name, layer.kind, layer.source
            )];
            lines.extend(
                layer
                    .properties
                    .iter()
                    .map(|(key, value)| format!("  {key}: {value}")),
            );
            lines.join("\n")
        })
    });

    dispatcher.register_consumer(ResultType::Catalog, |payload, _, output: &Output| {
        let Some(catalog) = payload.as_catalog() else {
            return Ok(());
        };
        output.render(ResultType::Catalog, catalog, || {
            let mut lines = vec![format!(
                "{} ({} entries)",
                catalog.title,
                catalog.entries.len()
            )];
            lines.extend(
                catalog
                    .entries
                    .iter()
                    .map(|entry| format!("  {:<30} {}", entry.title, entry.uri)),
            );
            lines.join("\n")
        })
    });

    dispatcher.register_consumer(ResultType::Any, |payload, _, output: &Output| {
        match payload {
            Payload::Custom { value, .. } => output.emit_json(payload.result_type(), value),
            other => {
                warn!(result_type = %other.result_type(), "No printer for result");
                Ok(())
            }
        }
    });

    dispatcher
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, cancelling");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn printed(payload: Payload, json: bool) -> Vec<String> {
        let output = Output::captured(json);
        printer()
            .dispatch(&payload, &Intent::for_uri("file:///data/a.bin"), &output)
            .unwrap();
        output.captured.unwrap().into_inner()
    }

    #[test]
    fn test_text_and_bytes_honour_json() {
        assert_eq!(printed(Payload::Text("hello".into()), false), vec!["hello"]);
        assert_eq!(printed(Payload::Text("hello".into()), true), vec!["\"hello\""]);

        let bytes = || Payload::Bytes(Bytes::from_static(b"\x00\x01\x02"));
        assert_eq!(printed(bytes(), false), vec!["file:///data/a.bin: 3 bytes"]);

        let json: serde_json::Value = serde_json::from_str(&printed(bytes(), true)[0]).unwrap();
        assert_eq!(json["size"], 3);
        assert_eq!(json["uri"], "file:///data/a.bin");
    }

    #[test]
    fn test_custom_result_printed_as_json() {
        let lines = printed(
            Payload::Custom {
                kind: "layer".into(),
                value: serde_json::json!({ "levels": 12 }),
            },
            false,
        );
        let json: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(json["levels"], 12);
    }
}
