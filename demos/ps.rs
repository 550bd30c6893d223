use anyhow::{Context, Result};
use dockhand::Docker;
use dockhand::api::ContainerListOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let docker = Docker::from_env().context("connecting to docker")?;

    let options = ContainerListOptions::builder().all(true).build();
    let containers = docker
        .containers()
        .list(&options)
        .await
        .context("listing containers")?;

    println!("{:<14} {:<28} {:<10} {}", "ID", "IMAGE", "STATE", "NAME");
    for container in containers {
        let id = container.id().chars().take(12).collect::<String>();
        println!(
            "{:<14} {:<28} {:<10} {}",
            id,
            container.image().unwrap_or_default(),
            container
                .state()
                .map(|state| state.to_string())
                .unwrap_or_default(),
            container.name().unwrap_or_default()
        );
    }

    Ok(())
}
