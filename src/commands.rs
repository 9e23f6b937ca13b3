use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ops::Operations;
use crate::options::{ArgBag, OperationOptions, OutputOptions};
use crate::out_path::resolve_output_path;
use crate::output::{OutputFormat, WriteOptions, write_with};
use crate::resources::{Action, ResourceSpec};

/// A fully validated request to run one action on one resource.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub spec: &'static ResourceSpec,
    pub action: Action,
    pub options: OperationOptions,
    pub output: OutputOptions,
}

#[derive(Debug)]
pub struct Outcome {
    pub path: PathBuf,
    pub value: Option<Value>,
}

impl Invocation {
    pub fn from_bag(spec: &'static ResourceSpec, action: Action, bag: &ArgBag) -> Result<Self> {
        if !spec.supports(action) {
            return Err(Error::validation(format!(
                "{} does not support {action}",
                spec.name
            )));
        }
        Ok(Self {
            spec,
            action,
            options: OperationOptions::from_bag(bag, spec, action)?,
            output: OutputOptions::from_bag(bag)?,
        })
    }

    /// Lists default to CSV, everything else to JSON.
    pub fn format(&self) -> OutputFormat {
        self.output.format.unwrap_or(match self.action {
            Action::List => OutputFormat::Csv,
            _ => OutputFormat::Json,
        })
    }

    pub fn output_path(&self, out_dir: &Path) -> PathBuf {
        resolve_output_path(
            self.output.out.as_deref(),
            out_dir,
            self.spec.name,
            self.action,
            self.format().extension(),
        )
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            csv_fieldnames: self.output.csv_fieldnames.clone(),
            csv_include_header: self.output.csv_include_header,
            also_console: self.output.also_console,
            mode: self.output.mode,
            ..WriteOptions::format(self.format())
        }
    }
}

/// Runs the operation and hands its result to the writer. Nothing is written on failure.
pub fn execute(ops: &Operations<'_>, inv: &Invocation, out_dir: &Path) -> Result<Outcome> {
    let path = inv.output_path(out_dir);
    let value = write_with(
        || ops.run(inv.spec, &inv.options),
        &path,
        &inv.write_options(),
    )?;
    match &value {
        Some(_) => log::info!("{} {}: wrote {}", inv.spec.name, inv.action, path.display()),
        None => log::info!("{} {}: empty response, nothing written", inv.spec.name, inv.action),
    }
    Ok(Outcome { path, value })
}
