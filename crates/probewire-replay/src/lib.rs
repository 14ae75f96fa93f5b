//! Replays captured backend traffic through the probewire engine.
//!
//! The tool reads a protocol description and a transcript of inbound
//! messages, binds a recording handler to every domain that declares events,
//! and prints each delivered event as a JSON line. It is useful for checking
//! a protocol description against real traffic without a live backend.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use probewire::{ConnectionOptions, ProtocolDescription};
use probewire_config::Config;

mod cli;
mod config;
mod errors;
mod replay;
pub mod telemetry;

use cli::Cli;
use config::{ConfigLoader, OrthoConfigLoader, split_arguments};
use errors::AppError;

/// Runs the replay tool with the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, &OrthoConfigLoader).unwrap_or_else(|error| {
        let _ = writeln!(stderr, "{error}");
        ExitCode::FAILURE
    })
}

fn run_with_loader<I, W, L>(args: I, stdout: &mut W, loader: &L) -> Result<ExitCode, AppError>
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    L: ConfigLoader,
{
    let split = split_arguments(args.into_iter().collect());
    let cli = Cli::try_parse_from(split.tool_arguments).map_err(AppError::CliUsage)?;
    let config: Config = loader.load(&split.config_arguments)?;
    telemetry::initialise(&config)?;

    let description = ProtocolDescription::from_path(&cli.protocol)?;
    let transcript =
        fs::read_to_string(&cli.transcript).map_err(|source| AppError::ReadTranscript {
            path: cli.transcript.clone(),
            source,
        })?;

    replay::replay(
        &description,
        &transcript,
        ConnectionOptions::from(&config),
        stdout,
    )?;
    Ok(ExitCode::SUCCESS)
}
