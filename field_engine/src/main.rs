use anyhow::Result;

mod cli;
mod runtime;

use cli::Command;

fn main() -> Result<()> {
    let (command, verbose) = cli::parse()?;

    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match command {
        Command::Run(args) => runtime::execute(args),
        Command::ListHooks(args) => runtime::list_hooks(args),
    }
}
