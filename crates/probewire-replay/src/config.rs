//! Separates configuration flags from the tool's own arguments.
//!
//! Leading flags recognised by `probewire-config` go to the layered loader;
//! everything from the first other token onwards goes to the tool's parser.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use probewire_config::Config;

use crate::errors::AppError;

/// Value-taking flags understood by the configuration loader.
///
/// The diagnostic switches are configured through the environment or the
/// configuration file.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--suppressed-error-code",
];

pub(crate) trait ConfigLoader {
    /// Loads layered configuration from the filtered arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Stop,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Stop
    }
}

/// Arguments split between the configuration loader and the tool's parser.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) tool_arguments: Vec<OsString>,
}

pub(crate) fn split_arguments(args: Vec<OsString>) -> ArgumentSplit {
    let mut remaining = args.into_iter();
    let Some(program) = remaining.next() else {
        return ArgumentSplit {
            config_arguments: Vec::new(),
            tool_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut tool_arguments = vec![program];
    let mut pending_value = false;

    for argument in remaining.by_ref() {
        if pending_value {
            config_arguments.push(argument);
            pending_value = false;
            continue;
        }
        match classify(&argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument);
                pending_value = needs_value;
            }
            FlagAction::Stop => {
                tool_arguments.push(argument);
                break;
            }
        }
    }
    tool_arguments.extend(remaining);

    ArgumentSplit {
        config_arguments,
        tool_arguments,
    }
}
