//! Check a playtime config file before handing it to the launcher.
//!
//! With no argument, the default config location is checked.

use playtime_config::{CURRENT_CONFIG_VERSION, ConfigError, LauncherPolicy, load_config};
use playtime_util::{default_config_path, format_duration};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);

    let config_path = match (args.next(), args.next()) {
        (None, _) => default_config_path(),
        (Some(flag), _) if flag == "-h" || flag == "--help" => {
            eprintln!("usage: validate-config [config-file]");
            eprintln!("default: {}", default_config_path().display());
            return ExitCode::SUCCESS;
        }
        (Some(path), None) => PathBuf::from(path),
        (Some(_), Some(_)) => {
            eprintln!("usage: validate-config [config-file]");
            return ExitCode::from(2);
        }
    };

    match load_config(&config_path) {
        Ok(policy) => {
            println!("{}: ok", config_path.display());
            print_summary(&policy);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: invalid", config_path.display());
            print_error(&e);
            ExitCode::from(1)
        }
    }
}

fn print_summary(policy: &LauncherPolicy) {
    let launcher = &policy.launcher;
    println!("  daily limit  {}", format_duration(launcher.daily_limit));
    println!("  kill grace   {}", format_duration(launcher.kill_grace));
    println!("  usage log    {}", launcher.usage_path().display());

    if policy.games.is_empty() {
        println!("  no games configured");
        return;
    }

    println!("  games:");
    for (index, game) in policy.games.iter().enumerate() {
        println!("  {:>3}  {}  [{}]", index + 1, game.name, game.argv().join(" "));
    }
}

fn print_error(error: &ConfigError) {
    match error {
        ConfigError::ValidationFailed { errors } => {
            for err in errors {
                eprintln!("  - {}", err);
            }
        }
        ConfigError::UnsupportedVersion(found) => {
            eprintln!(
                "  config_version = {} is not supported (this build reads {})",
                found, CURRENT_CONFIG_VERSION
            );
        }
        ConfigError::ReadError(_) | ConfigError::ParseError(_) => eprintln!("  {}", error),
    }
}
