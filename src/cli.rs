// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Command-line surface of the `kflex` binary

use crate::config::Config;
use crate::kubeconfig::KubeconfigFile;
use crate::store::{connect, KubeStore};
use crate::workflow::{
    delete_context, restore_home_context, switch_context, CreateWorkflow, TracingReporter,
};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// kflex - hosted Kubernetes control planes
#[derive(Parser, Debug)]
#[command(name = "kflex")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Kubeconfig of the hosting cluster, also the file contexts are merged into
    #[arg(long, global = true)]
    pub kubeconfig: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a control plane and switch to its context
    Create(CreateArgs),
    /// Switch to a control plane's context, or back home without a name
    Ctx(CtxArgs),
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Name of the control plane
    pub name: String,

    /// Give up waiting for a workload after this many seconds
    #[arg(long, env = "KFLEX_WAIT_TIMEOUT_SECS")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct CtxArgs {
    /// Name of the control plane
    pub name: Option<String>,

    /// Remove the control plane's context instead of switching to it
    #[arg(long, requires = "name")]
    pub delete: bool,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::from_env()?;
        if self.kubeconfig.is_some() {
            config.kubeconfig = self.kubeconfig;
        }
        let contexts = KubeconfigFile::discover(config.kubeconfig.as_deref())?;

        match self.command {
            Commands::Create(args) => create(args, config, &contexts).await,
            Commands::Ctx(args) => ctx(args, &contexts),
        }
    }
}

async fn create(args: CreateArgs, mut config: Config, contexts: &KubeconfigFile) -> Result<()> {
    if let Some(secs) = args.timeout {
        config.wait_timeout = Some(Duration::from_secs(secs));
    }

    // The client must talk to the hosting cluster, not a previously created
    // control plane.
    restore_home_context(contexts, false)?;

    let client = connect(config.kubeconfig.as_deref()).await?;
    let store = KubeStore::new(client);
    info!("Connected to hosting cluster");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, abandoning pending waits");
            on_interrupt.cancel();
        }
    });

    CreateWorkflow::new(&store, &store, contexts, &TracingReporter, &config)
        .with_cancellation(cancel)
        .run(&args.name)
        .await?;
    Ok(())
}

fn ctx(args: CtxArgs, contexts: &KubeconfigFile) -> Result<()> {
    match (args.name, args.delete) {
        (Some(name), true) => delete_context(contexts, &name)?,
        (Some(name), false) => switch_context(contexts, &name)?,
        (None, _) => restore_home_context(contexts, false)?,
    }
    Ok(())
}
