use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::options::ArgBag;
use crate::resources::{self, Action, ResourceSpec};

/// Option flags forwarded into the argument bag under their arg id.
const TEXT_ARGS: &[&str] = &[
    "out",
    "format",
    "csv_fieldnames",
    "offset",
    "limit",
    "sort",
    "filter",
    "calculate_count",
    "id",
    "name",
    "file",
];

const FLAG_ARGS: &[&str] = &["append", "no_header", "verbose"];

pub fn field_key(field: &str) -> String {
    format!("field__{field}")
}

pub fn build_cli() -> Command {
    let mut cmd = Command::new("clearpass")
        .about("Aruba ClearPass Policy Manager REST API client")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("server")
                .long("server")
                .global(true)
                .value_name("HOST[:PORT]")
                .help("ClearPass server (env: CLEARPASS_SERVER)"),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .global(true)
                .value_name("SCHEME")
                .help("https or http (env: CLEARPASS_SCHEME, default https)"),
        )
        .arg(
            Arg::new("insecure")
                .long("insecure")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Skip TLS certificate verification (env: CLEARPASS_INSECURE)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("HTTP timeout in seconds (env: CLEARPASS_TIMEOUT, default 15)"),
        )
        .arg(
            Arg::new("client_id")
                .long("client-id")
                .global(true)
                .value_name("ID")
                .help("OAuth client id (env: CLEARPASS_CLIENT_ID)"),
        )
        .arg(
            Arg::new("client_secret")
                .long("client-secret")
                .global(true)
                .value_name("SECRET")
                .help("OAuth client secret (env: CLEARPASS_CLIENT_SECRET)"),
        )
        .arg(
            Arg::new("grant_type")
                .long("grant-type")
                .global(true)
                .value_name("GRANT")
                .help("OAuth grant type (env: CLEARPASS_GRANT_TYPE, default client_credentials)"),
        )
        .arg(
            Arg::new("out_dir")
                .long("out-dir")
                .global(true)
                .value_name("DIR")
                .help("Directory for default output files (env: CLEARPASS_OUT_DIR, default ./logs)"),
        )
        .arg(
            Arg::new("api_paths")
                .long("api-paths")
                .global(true)
                .value_name("FILE")
                .help("JSON file replacing the built-in API path table (env: CLEARPASS_API_PATHS)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Also print the output to the console"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        );

    for module in resources::modules() {
        let mut module_cmd = Command::new(module)
            .about(format!("{module} resources"))
            .subcommand_required(true)
            .arg_required_else_help(true);
        for spec in resources::resources_in(module) {
            let mut res_cmd = Command::new(spec.name)
                .about(spec.about)
                .subcommand_required(true)
                .arg_required_else_help(true);
            for action in spec.actions {
                res_cmd = res_cmd.subcommand(build_action(spec, *action));
            }
            module_cmd = module_cmd.subcommand(res_cmd);
        }
        cmd = cmd.subcommand(module_cmd);
    }

    cmd
}

fn build_action(spec: &ResourceSpec, action: Action) -> Command {
    let mut cmd = Command::new(action.name()).about(action.about());
    let mut taken: HashSet<&str> = HashSet::new();

    for arg in output_args() {
        cmd = cmd.arg(arg);
    }

    if action == Action::List {
        cmd = cmd
            .arg(text_arg("offset", "N", "Index of the first entry (default 0)"))
            .arg(text_arg("limit", "N", "Entries per page, 1-1000 (default 25)"))
            .arg(text_arg(
                "sort",
                "FIELD",
                &format!("Sort order, e.g. +id or -id (default {})", spec.default_sort),
            ))
            .arg(text_arg("filter", "JSON", "Server-side filter expression, sent as is"))
            .arg(
                Arg::new("calculate_count")
                    .long("calculate-count")
                    .value_name("BOOL")
                    .num_args(0..=1)
                    .default_missing_value("true")
                    .help("Ask the server for a total count"),
            );
    }

    if action.takes_selector() {
        cmd = cmd
            .arg(text_arg("id", "ID", "Entry id"))
            .arg(text_arg("name", "NAME", "Entry name (used when --id is absent)"));
        taken.insert("name");
    }

    if action.takes_payload() {
        cmd = cmd
            .arg(text_arg("file", "FILE", "Payload file (.json object/list or .csv)"))
            .arg(
                Arg::new("set")
                    .long("set")
                    .value_name("KEY=VALUE")
                    .action(ArgAction::Append)
                    .help("Extra payload field (repeatable)"),
            );
        for field in spec.payload_fields() {
            if !taken.insert(field) {
                continue;
            }
            let required = action != Action::Update && spec.required.contains(&field);
            let help = if required {
                format!("{field} (required unless --file)")
            } else {
                field.to_string()
            };
            cmd = cmd.arg(
                Arg::new(field_key(field))
                    .long(field)
                    .value_name("VALUE")
                    .help(help),
            );
        }
    }

    cmd
}

fn output_args() -> Vec<Arg> {
    vec![
        text_arg("out", "FILE", "Write here instead of the default output file"),
        Arg::new("format")
            .long("format")
            .value_name("FORMAT")
            .value_parser(["json", "csv", "raw"])
            .help("Output format (list defaults to csv, others to json)"),
        Arg::new("append")
            .long("append")
            .action(ArgAction::SetTrue)
            .help("Append to the output file instead of overwriting it"),
        Arg::new("no_header")
            .long("no-header")
            .action(ArgAction::SetTrue)
            .help("Leave out the CSV header row"),
        text_arg("csv_fieldnames", "A,B,C", "CSV columns (default: keys of the first row)"),
    ]
}

fn text_arg(id: &'static str, value_name: &'static str, help: &str) -> Arg {
    Arg::new(id)
        .long(id.replace('_', "-"))
        .value_name(value_name)
        .help(help.to_string())
}

fn get_text(matches: &ArgMatches, id: &str) -> Option<String> {
    matches.try_get_one::<String>(id).ok().flatten().cloned()
}

fn get_flag(matches: &ArgMatches, id: &str) -> bool {
    matches
        .try_get_one::<bool>(id)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}

/// Flattens the action's matches into the loose bag the option builders read.
pub fn bag_from_matches(spec: &ResourceSpec, matches: &ArgMatches) -> Result<ArgBag> {
    let mut bag = ArgBag::new();
    for id in TEXT_ARGS {
        if let Some(value) = get_text(matches, id) {
            bag = bag.text(id, &value);
        }
    }
    for id in FLAG_ARGS {
        if get_flag(matches, id) {
            bag = bag.flag(id, true);
        }
    }
    for field in spec.payload_fields() {
        if let Some(value) = get_text(matches, &field_key(field)) {
            bag = bag.text(field, &value);
        }
    }
    if let Ok(Some(pairs)) = matches.try_get_many::<String>("set") {
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| Error::validation(format!("--set expects KEY=VALUE, got {pair}")))?;
            bag = bag.text(key.trim(), value);
        }
    }
    Ok(bag)
}
