//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`proxy`], [`relay`], [`validate`], or [`health`].
//! Each handler lives in its own submodule.

pub mod health;
pub mod proxy;
pub mod relay;
pub mod validate;

use crate::cli::{Cli, Commands};
use crate::error::CourierError;

pub async fn dispatch(cli: Cli) -> Result<(), CourierError> {
    match cli.command {
        Some(Commands::Proxy(args)) => proxy::execute(*args).await,
        Some(Commands::Relay(args)) => relay::execute(*args).await,
        Some(Commands::Validate(ref args)) => validate::execute(args),
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  courier v{version} \u{2014} minimal HTTP forwarding layer\n\n  \
         No command provided. To get started:\n\n    \
         courier proxy                     Forward every request to TARGET_BASE_URL\n    \
         courier relay                     Poll CLOUDFLARE_API_URL, post to TARGET_API_URL_BASE\n    \
         courier validate                  Check the environment configuration\n    \
         courier --help                    See all commands and options\n"
    );
}
