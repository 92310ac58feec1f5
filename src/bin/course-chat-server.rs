// ABOUTME: Server binary for the course chat relay
// ABOUTME: Loads and validates configuration, initializes logging, and serves the chat endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Course Chat Server Binary
//!
//! Starts the `/chat` relay. Configuration comes from the environment and is
//! validated in full before anything listens; every invalid field is reported
//! at once.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use course_chat::{
    config::ServerConfig,
    logging,
    server::{ChatServer, ServerResources},
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "course-chat-server")]
#[command(about = "Course chat relay - streaming proxy to the Groq chat API")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Validate configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return Err(e.into());
        }
    };

    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    if args.check_config {
        println!("Configuration is valid");
        println!("{}", config.summary());
        return Ok(());
    }

    logging::init_from_env()?;

    info!("Starting course chat relay");
    info!("{}", config.summary());

    let port = config.http_port;
    let resources = Arc::new(ServerResources::new(config)?);
    let server = ChatServer::new(resources);

    if let Err(e) = server.run(port).await {
        error!("Server error: {}", e);
        return Err(e);
    }

    Ok(())
}
