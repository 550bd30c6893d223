use anyhow::{Context, Result};
use dockhand::Docker;
use dockhand::api::EventsOptions;
use futures_util::StreamExt;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dockhand=debug".parse().unwrap()),
        )
        .init();

    let docker = Docker::from_env().context("connecting to docker")?;

    println!("Watching daemon events, Ctrl-C to stop...");
    let events = docker.events();
    let mut stream = events
        .watch(&EventsOptions::default())
        .await
        .context("subscribing to events")?;

    while let Some(event) = stream.next().await {
        let event = event.context("decoding event")?;
        println!(
            "{} {} {} ({})",
            event
                .time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            event.kind().unwrap_or("-"),
            event.action().unwrap_or("-"),
            event
                .actor_attributes()
                .get("name")
                .copied()
                .unwrap_or("-")
        );
    }

    Ok(())
}
