use std::time::Duration;

use anyhow::{Context, Result};
use dockhand::Docker;
use dockhand::api::{ContainerCreateOptions, ContainerRemoveOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let docker = Docker::from_env().context("connecting to docker")?;

    let container_name = "lifecycle-demo";
    println!("Pulling alpine:3.20...");
    docker
        .images()
        .pull("alpine", "3.20")
        .await
        .context("pulling image")?;

    println!("Creating container '{container_name}'...");
    let options = ContainerCreateOptions::builder()
        .name(container_name)
        .image("alpine:3.20")
        .cmd(vec!["sleep".to_string(), "300".to_string()])
        .build();
    let container = docker
        .containers()
        .create(&options)
        .await
        .context("creating container")?;

    println!("Starting container '{container_name}'...");
    container.start().await.context("starting container")?;
    print_state(&docker, container_name).await?;

    println!("Stopping container '{container_name}'...");
    container
        .stop(Some(Duration::from_secs(5)))
        .await
        .context("stopping container")?;
    print_state(&docker, container_name).await?;

    println!("Removing container '{container_name}'...");
    container
        .remove(&ContainerRemoveOptions::builder().force(true).build())
        .await
        .context("removing container")?;

    println!("Container '{container_name}' removed successfully");

    Ok(())
}

async fn print_state(docker: &Docker, container_name: &str) -> Result<()> {
    let container = docker
        .containers()
        .get(container_name)
        .await
        .context("inspecting container")?;

    match container.state() {
        Some(state) => println!("State: {state}"),
        None => println!("State: unknown"),
    }

    Ok(())
}
