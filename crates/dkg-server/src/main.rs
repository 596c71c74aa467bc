use dkg_server::{
    config::Config,
    opts::{Command, ServerOpts},
    serve,
};

use gumdrop::Options;
use std::{process, sync::Arc};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = ServerOpts::parse_args_default_or_exit();

    let command = opts.command.unwrap_or_else(|| {
        eprintln!("No command was provided.");
        eprintln!("{}", ServerOpts::usage());
        process::exit(2)
    });

    match command {
        Command::Serve(opts) => {
            serve::init_tracing(opts.verbose);
            let mut config = Config::load(opts.config.as_deref())?;
            config.apply(&opts);
            serve::run(config, Arc::new(dkg_engine_ffi::linked())).await?;
        }
        Command::PrintConfig(opts) => {
            let config = Config::load(opts.config.as_deref())?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
