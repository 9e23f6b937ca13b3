mod api_paths;
mod cli;
mod client;
mod commands;
mod config;
mod error;
mod logging;
mod normalize;
mod ops;
mod options;
mod out_path;
mod output;
mod payload;
mod resources;

use anyhow::{Result, anyhow};
use clap::ArgMatches;

use api_paths::load_api_paths;
use client::ClearPassClient;
use commands::{Invocation, execute};
use config::load_config;
use logging::Logging;
use ops::Operations;
use resources::{Action, find_resource};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        let code = err
            .downcast_ref::<error::Error>()
            .map(error::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn parse_args() -> ArgMatches {
    match cli::build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            // clap exits with 2 on usage errors; 2 is reserved for server failures here.
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    }
}

fn run() -> Result<()> {
    let matches = parse_args();
    let logging = Logging::init();
    logging.set_debug(matches.get_flag("debug"));

    let (module, module_matches) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("module required"))?;
    let (resource, resource_matches) = module_matches
        .subcommand()
        .ok_or_else(|| anyhow!("resource required"))?;
    let (action_name, action_matches) = resource_matches
        .subcommand()
        .ok_or_else(|| anyhow!("action required"))?;

    let spec = find_resource(resource)
        .filter(|spec| spec.module == module)
        .ok_or_else(|| anyhow!("unknown resource {module} {resource}"))?;
    let action =
        Action::parse(action_name).ok_or_else(|| anyhow!("unknown action {action_name}"))?;

    // Everything local is checked before credentials or the network are touched.
    let bag = cli::bag_from_matches(spec, action_matches)?;
    let invocation = Invocation::from_bag(spec, action, &bag)?;

    let config = load_config(&matches)?;
    log::debug!("server {}{}", config.https_prefix, config.server);
    let paths = load_api_paths(config.api_paths.as_deref())?;
    let client = ClearPassClient::from_config(&config)?;
    let token = client.access_token(&paths, &config.credentials)?;

    let ops = Operations::new(&client, &paths, &token);
    let outcome = execute(&ops, &invocation, &config.out_dir)?;
    if outcome.value.is_some() {
        log::info!("output: {}", outcome.path.display());
    }
    Ok(())
}
