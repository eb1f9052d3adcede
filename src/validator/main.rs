//! Standalone validator for dispatcher settings files.
//!
//! Checks that a settings file parses, that every prefix is usable, and
//! points out combinations that are legal but probably unintended.

use std::process::ExitCode;

use clap::Parser;

use guild_commands::config::{CommandSettings, NoticeKind};

/// Cooldowns above this many seconds get a warning.
const LONG_COOLDOWN_SECS: u64 = 3600;

/// Settings file validator.
#[derive(Parser, Debug)]
#[command(name = "validate_settings")]
#[command(about = "Validates settings files for the guild command dispatcher")]
#[command(version)]
struct Args {
    /// Path to the JSON settings file to validate.
    #[arg(short, long, default_value = "settings.json")]
    file: String,

    /// Generate an example settings file at the specified path.
    #[arg(long)]
    generate_example: Option<String>,

    /// Show a summary of every setting.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Handle example generation
    if let Some(output_path) = args.generate_example {
        return generate_example(&output_path);
    }

    validate_settings(&args.file, args.verbose)
}

fn generate_example(output_path: &str) -> ExitCode {
    let example = CommandSettings::example();

    match example.save_to_file(output_path) {
        Ok(()) => {
            println!("✓ Example settings written to: {output_path}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Failed to write example file: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate_settings(path: &str, verbose: bool) -> ExitCode {
    println!("Validating: {path}\n");

    let settings = match CommandSettings::load_from_file(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("✗ Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    if verbose {
        print_summary(&settings);
    }

    if let Err(e) = settings.validate() {
        println!("✗ Validation failed: {e}");
        return ExitCode::FAILURE;
    }

    let warnings = collect_warnings(&settings);
    for warning in &warnings {
        println!("  ⚠ Warning: {warning}");
    }

    if warnings.is_empty() {
        println!("✓ Settings are valid!");
    } else {
        println!("✓ Settings are valid ({} warning(s))", warnings.len());
    }
    ExitCode::SUCCESS
}

fn print_summary(settings: &CommandSettings) {
    println!("Default prefix:      \"{}\"", settings.default_prefix);
    println!("Ignore case:         {}", settings.ignore_case);
    println!("Cooldown:            {}s", settings.cooldown_secs);
    println!("Custom prefixes:     {}", settings.custom_prefixes.len());
    println!("Blacklisted guilds:  {}", settings.blacklisted_guilds.len());
    println!("Blacklisted channels: {}", settings.blacklisted_channels.len());

    for (label, kind) in notice_kinds() {
        let state = if settings.notices.get(kind).is_some() {
            "set"
        } else {
            "unset"
        };
        println!("Notice {label:<20} {state}");
    }
    println!();
}

fn collect_warnings(settings: &CommandSettings) -> Vec<String> {
    let mut warnings = Vec::new();

    let mut prefixes: Vec<(Option<u64>, &str)> = vec![(None, settings.default_prefix.as_str())];
    let mut guilds: Vec<(&u64, &String)> = settings.custom_prefixes.iter().collect();
    guilds.sort_unstable();
    prefixes.extend(guilds.into_iter().map(|(id, p)| (Some(*id), p.as_str())));

    for (guild, prefix) in prefixes {
        if prefix.trim().is_empty() {
            warnings.push(format!("{} is only whitespace", describe(guild)));
        } else if prefix.starts_with(char::is_whitespace) {
            warnings.push(format!("{} starts with whitespace", describe(guild)));
        }
    }

    let mut shadowed: Vec<u64> = settings
        .custom_prefixes
        .keys()
        .filter(|id| settings.blacklisted_guilds.contains(*id))
        .copied()
        .collect();
    shadowed.sort_unstable();
    for id in shadowed {
        warnings.push(format!("Guild {id} has a custom prefix but is blacklisted"));
    }

    if settings.cooldown_secs > LONG_COOLDOWN_SECS {
        warnings.push(format!(
            "Cooldown of {}s is longer than {LONG_COOLDOWN_SECS}s",
            settings.cooldown_secs
        ));
    }

    if settings.cooldown_secs == 0 && settings.notices.cooldown.is_some() {
        warnings.push("Cooldown notice is set but cooldown is disabled".to_owned());
    }

    warnings
}

fn describe(guild: Option<u64>) -> String {
    match guild {
        Some(id) => format!("Custom prefix for guild {id}"),
        None => "Default prefix".to_owned(),
    }
}

const fn notice_kinds() -> [(&'static str, NoticeKind); 4] {
    [
        ("guild_blacklisted:", NoticeKind::GuildBlacklisted),
        ("channel_blacklisted:", NoticeKind::ChannelBlacklisted),
        ("cooldown:", NoticeKind::Cooldown),
        ("unknown_command:", NoticeKind::UnknownCommand),
    ]
}
