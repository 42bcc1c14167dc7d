//! PPF CLI application
//!
//! Command-line and MCP front end of the intervention workflow engine.

mod args;
mod cli;
mod mcp;
mod renderer;

use std::{io::Read, sync::Arc};

use anyhow::{Context, Result};
use args::{Args, Commands};
use clap::Parser;
use cli::Cli;
use log::info;
use mcp::{run_stdio_server, PpfMcpServer};
use ppf_core::{
    params::ListInterventions,
    photo::{ConnectivityFlag, FixedLocation},
    Session, WorkflowBuilder,
};
use renderer::TerminalRenderer;
use Commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let Args {
        database_file,
        config,
        technician,
        offline,
        location,
        no_color,
        command,
    } = Args::parse();

    let mut builder = WorkflowBuilder::new()
        .with_database_path(database_file)
        .with_config_file(config)
        .context("Failed to load configuration")?
        .with_connectivity(Arc::new(ConnectivityFlag::new(!offline)));
    if let Some(location) = location {
        builder = builder.with_geolocator(Arc::new(FixedLocation(location)));
    }
    let workflow = builder.build().await.context("Failed to initialize workflow")?;

    let session = Session::new(technician);
    let renderer = TerminalRenderer::new(!no_color);

    info!("PPF started for {}", session.user_id);

    match command {
        Some(Intervention { command }) => {
            Cli::new(workflow, session, renderer)
                .handle_intervention_command(command)
                .await
        }
        Some(Step { command }) => {
            Cli::new(workflow, session, renderer)
                .handle_step_command(command)
                .await
        }
        Some(Photo { command }) => {
            Cli::new(workflow, session, renderer)
                .handle_photo_command(command)
                .await
        }
        Some(Exec { request }) => {
            let raw = match request {
                Some(raw) => raw,
                None => {
                    let mut raw = String::new();
                    std::io::stdin()
                        .read_to_string(&mut raw)
                        .context("Failed to read request from stdin")?;
                    raw
                }
            };
            Cli::new(workflow, session, renderer).exec(&raw).await
        }
        Some(Serve) => {
            info!("Starting PPF MCP server");
            run_stdio_server(PpfMcpServer::new(workflow, session))
                .await
                .context("MCP server failed")
        }
        None => {
            Cli::new(workflow, session, renderer)
                .list_interventions(&ListInterventions::default())
                .await
        }
    }
}
