//! CLI entrypoint for formpanel.

mod cli;
mod http;
mod report;
mod settings;
mod style;

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use formpanel_core::{Form, FormOptions, NullChrome, TabPolicy};
use formpanel_schema::{json, xml, Schema, ValuesPayload};
use tracing::info;

use cli::{Cli, Command, Format};
use http::HttpTransport;
use report::Report;
use settings::Settings;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{}", style::error(format!("Error: {err:#}")));
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the form is invalid or a checker failed.
fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    match cli.command {
        Command::Check {
            schema,
            values,
            endpoint,
            run_checkers,
            format,
        } => {
            let mut form = load_form(&schema, values.as_deref(), settings.form.clone())?;
            let valid = form.is_valid();
            if run_checkers {
                let Some(url) = endpoint.or_else(|| settings.endpoint.url.clone()) else {
                    bail!("--run-checkers needs --endpoint or endpoint.url in the config file");
                };
                let mut transport = HttpTransport::new(url, &settings.endpoint);
                let outcome = form.check_with(&mut transport, None, false, true)?;
                info!(
                    tested = outcome.tested.len(),
                    failures = outcome.failures.len(),
                    "field checkers ran"
                );
            }
            let report = Report::collect(&form, valid);
            match format {
                Format::Text => println!("{}", report.render_text(true)),
                Format::Json => println!("{}", report.render_json()?),
            }
            Ok(report.valid && !report.has_failures())
        }
        Command::Toc { schema, values } => {
            let options = FormOptions {
                tab_policy: TabPolicy::Linear,
                ..settings.form
            };
            let mut form = load_form(&schema, values.as_deref(), options)?;
            let valid = form.is_valid();
            if let Some(toc) = form.toc() {
                println!("{}", toc.render());
            }
            Ok(valid)
        }
    }
}

fn load_form(
    schema: &Path,
    values: Option<&Path>,
    options: FormOptions,
) -> anyhow::Result<Form<NullChrome>> {
    let separator = options.separator.clone();
    let schema = read_schema(schema)?;
    let mut form = Form::build(schema, options)?;
    let payload = match values {
        Some(path) => read_values(path, &separator)?,
        None => ValuesPayload::default(),
    };
    form.set_values(&payload)?;
    Ok(form)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
}

fn read_schema(path: &Path) -> anyhow::Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let schema = if is_xml(path) {
        xml::parse_schema(&text)
    } else {
        json::parse_schema(&text)
    };
    schema.with_context(|| format!("invalid schema {}", path.display()))
}

fn read_values(path: &Path, separator: &str) -> anyhow::Result<ValuesPayload> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read values {}", path.display()))?;
    let payload = if is_xml(path) {
        ValuesPayload::from_xml(&text, separator)
    } else {
        ValuesPayload::from_json(&text)
    };
    payload.with_context(|| format!("invalid values {}", path.display()))
}
