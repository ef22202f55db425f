//! Plexus CLI - One command line composed from every discovered module.

mod builtin;
mod config;
mod discovery;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use miette::{Result, miette};
use plexus_core::CoreError;
use plexus_engine::{ArgvLayout, CliEngine, EngineError};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::output::TerminalRenderer;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "PLEXUS_LOG";

/// Exit code for command lines the composed tree rejects.
const USAGE_EXIT: u8 = 2;

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if let Err(e) = result {
        eprintln!("Log system initialization failed: {e}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let root = discovery::find_package_root()?;
    let config_file = discovery::config_file();
    let settings = Settings::load(root, config_file.as_deref(), |key| std::env::var(key).ok())?;

    let config = settings.engine_config().with_argv_layout(ArgvLayout::Native);
    let mut engine = CliEngine::new(config)
        .with_renderer(Arc::new(TerminalRenderer::new(settings.animation())));

    engine
        .register(builtin::utils(Arc::new(settings)))
        .await
        .map_err(|e| miette!("{}", describe(&e)))?;

    match engine.run(std::env::args()).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(EngineError::Execution(CoreError::Usage(text))) => {
            eprintln!("{}", text.trim_end());
            Ok(ExitCode::from(USAGE_EXIT))
        }
        Err(EngineError::Execution(CoreError::ActionFailed {
            command,
            exit_code: Some(code),
            reason,
        })) => {
            eprintln!("{}", output::error(&format!("{}: {}", command, reason)));
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        Err(e) => Err(miette!("{}", describe(&e))),
    }
}

/// Formats an error followed by its chain of causes.
fn describe(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(&format!("\n  caused by: {}", cause));
        source = cause.source();
    }
    message
}
