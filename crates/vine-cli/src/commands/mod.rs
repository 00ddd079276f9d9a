//! Command implementations and dispatch logic.
//!
//! Each command is an async function taking the shared `CommandContext`.
//! Configuration is loaded per command so flags can layer on top of it.

use camino::Utf8PathBuf;
use tracing::{debug, info};
use vine_config::{ConfigLayering, ConfigLoader, FollowConfig};
use vine_core::error::{VineError, VineResult};
use vine_follow::{CancellationToken, Follower};

pub mod checkpoint;
pub mod follow;


use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub config_path: Option<Utf8PathBuf>,
    pub output: OutputHandler,
}

impl CommandContext {
    pub fn new(config_path: Option<Utf8PathBuf>) -> VineResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| VineError::io("Failed to get current directory".to_string(), e))?;
        let cwd = Utf8PathBuf::try_from(cwd).map_err(|e| {
            VineError::io("Current directory is not valid UTF-8".to_string(), e.into_io_error())
        })?;

        Ok(Self {
            cwd,
            config_path,
            output: OutputHandler::new(),
        })
    }

    /// Load the configuration file and apply `layering` on top of it
    pub async fn load_config(&self, layering: ConfigLayering) -> VineResult<FollowConfig> {
        let loader = ConfigLoader::new(self.cwd.clone());
        let (base, source) = loader.load(self.config_path.clone()).await?;
        debug!(source = ?source, "configuration loaded");
        layering.merge(base)
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> anyhow::Result<()> {
    match command {
        Commands::Follow {
            since,
            concurrency,
            limit,
            on_error,
        } => {
            let args = follow::FollowArgs {
                since,
                concurrency,
                limit,
                on_error,
            };
            let config = ctx
                .load_config(args.layering(ConfigLayering::new().with_process_env()))
                .await?;
            let follower = Follower::new(config)?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted, stopping");
                    on_interrupt.cancel();
                }
            });

            let summary = follow::run(&follower, args.limit, cancel, &ctx.output).await?;
            ctx.output.success(&summary.to_string());
            Ok(())
        },
        Commands::Checkpoint => {
            let config = ctx.load_config(ConfigLayering::new().with_process_env()).await?;
            let position = checkpoint::show(&config).await;
            ctx.output.value(&position.to_string());
            Ok(())
        },
        Commands::Reset => {
            let config = ctx.load_config(ConfigLayering::new().with_process_env()).await?;
            if !config.checkpoint_path.exists() {
                ctx.output
                    .warn(&format!("No checkpoint stored at {}", config.checkpoint_path));
                return Ok(());
            }
            checkpoint::reset(&config).await?;
            ctx.output
                .success(&format!("Checkpoint {} reset", config.checkpoint_path));
            Ok(())
        },
        Commands::Version => {
            show_version(ctx);
            Ok(())
        },
    }
}

fn show_version(ctx: &CommandContext) {
    let target = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    ctx.output.value(&format!("vine v{}", env!("CARGO_PKG_VERSION")));
    ctx.output
        .info(&format!("Built: {} ({})", env!("BUILD_DATE"), env!("BUILD_PROFILE")));
    ctx.output.info(&format!("Target: {}", target));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));
}
