// src/cli/dispatcher.rs

use anyhow::Result;
use colored::Colorize;

use crate::{
    cli::handlers,
    core::args::{ArgStream, ChoiceOptions, ChoiceSet},
    CancellationToken,
};

/// Defines a system command, its aliases, and its handler. Handlers
/// receive the argument stream with the command name already consumed.
pub struct CommandDefinition {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub handler: fn(ArgStream, &CancellationToken) -> Result<()>,
}

impl std::fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDefinition").field("name", &self.name).finish()
    }
}

/// The single source of truth for all system commands. To add a command,
/// add an entry here.
pub static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "batch",
        aliases: &[],
        handler: handlers::batch::handle,
    },
    CommandDefinition {
        name: "csv",
        aliases: &[],
        handler: handlers::csv::handle,
    },
    CommandDefinition {
        name: "info",
        aliases: &[],
        handler: handlers::user::handle_info,
    },
    CommandDefinition {
        name: "update",
        aliases: &[],
        handler: handlers::user::handle_update,
    },
    CommandDefinition {
        name: "version",
        aliases: &["ver"],
        handler: handlers::version::handle,
    },
];

/// Finds a command definition by its name or alias.
pub fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Every registry name and alias, as a choice set for the dispatcher's
/// own `read_choice` call.
fn registry_choices() -> ChoiceSet {
    let mut set = ChoiceSet::new(COMMAND_REGISTRY.iter().map(|cmd| cmd.name));
    for cmd in COMMAND_REGISTRY {
        for alias in cmd.aliases {
            set = set.alias(alias, cmd.name);
        }
    }
    set
}

/// Checks registry invariants once at startup: names and aliases must be
/// unique across the whole table.
pub fn validate_registry() {
    let mut seen = std::collections::HashSet::new();
    for cmd in COMMAND_REGISTRY {
        debug_assert!(seen.insert(cmd.name), "duplicate command name: {}", cmd.name);
        for alias in cmd.aliases {
            debug_assert!(seen.insert(alias), "duplicate command alias: {}", alias);
        }
    }
}

/// The main dispatcher: resolves the first token against the registry and
/// hands the rest of the stream to the handler.
pub fn dispatch(all_args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    validate_registry();
    log::debug!("dispatching args: {:?}", all_args);

    if all_args.is_empty() {
        print_usage();
        return Ok(());
    }

    let mut args = ArgStream::new(all_args);
    let choices = registry_choices();
    let name = args
        .read_choice("command", &choices, &ChoiceOptions::required())?
        .expect("a required choice always resolves");
    let command = find_command(&name)
        .ok_or_else(|| anyhow::anyhow!("internal error: registry lookup failed for '{}'", name))?;

    (command.handler)(args, cancellation_token)
}

fn print_usage() {
    println!("{} {}", "bulkctl".bold(), env!("CARGO_PKG_VERSION"));
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Commands:");
    for cmd in COMMAND_REGISTRY {
        if cmd.aliases.is_empty() {
            println!("  {}", cmd.name.cyan());
        } else {
            println!("  {} ({})", cmd.name.cyan(), cmd.aliases.join(", "));
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names_and_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for cmd in COMMAND_REGISTRY {
            assert!(seen.insert(cmd.name), "duplicate name {}", cmd.name);
            for alias in cmd.aliases {
                assert!(seen.insert(alias), "duplicate alias {}", alias);
            }
        }
    }

    #[test]
    fn test_find_command_by_name_and_alias() {
        assert_eq!(find_command("version").unwrap().name, "version");
        assert_eq!(find_command("ver").unwrap().name, "version");
        assert!(find_command("nonesuch").is_none());
    }

    #[test]
    fn test_unknown_command_is_a_usage_error() {
        use crate::core::args::UsageError;
        let token = crate::CancellationToken::default();
        let err = dispatch(vec!["frobnicate".to_string()], &token).unwrap_err();
        let usage = err.downcast_ref::<UsageError>().expect("usage error");
        assert!(usage.command_line.contains(">>>frobnicate<<<"));
    }
}
