//! `slots` CLI: expand recurrence rules, filter listings and check conflicts
//! from the command line, offline, on JSON files.
//!
//! ## Usage
//!
//! ```sh
//! # Expand weekly rules into dated listings from today
//! slots expand --rules rules.json --exclusions exclusions.json
//!
//! # Expand as of a fixed day, writing to a file
//! slots expand --rules rules.json --today 2024-01-01 -o listings.json
//!
//! # Filter listings (stdin → stdout)
//! cat listings.json | slots filter --skill skiing --max-price 80
//!
//! # Check a proposed listing against a teacher's existing ones
//! slots check --candidate new.json --singles singles.json --rules rules.json
//!
//! # Convert between 24-hour and display times
//! slots time 14:30
//! slots time "2:30 PM" --to-24h
//! ```

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::{self, Read};
use std::process;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use slot_engine::{
    expand_all, filter_listings, find_conflicts, format_display, parse_time, to_24_hour, Candidate,
    ConflictScope, EngineConfig, Exclusion, ExclusionIndex, FilterCriteria, Listing,
    NewRecurrenceRule, NewSlot, RecurrenceRule, Skill, Slot, TimeOfDay,
};

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Availability tooling for lesson listings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration as JSON (falls back to SLOTS_* environment variables)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level written to stderr
    #[arg(long, global = true, env = "SLOTS_LOG", default_value = "warn")]
    log_level: Level,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand recurrence rules into dated listings
    Expand {
        /// JSON array of recurrence rules
        #[arg(long)]
        rules: String,
        /// JSON array of exclusions
        #[arg(long)]
        exclusions: Option<String>,
        /// First day to produce listings for (defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Filter a JSON array of listings
    Filter {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Earliest date, inclusive
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        /// Latest date, inclusive
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
        /// skiing or snowboarding
        #[arg(long)]
        skill: Option<Skill>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        /// Listings must start at or after this time (HH:MM)
        #[arg(long, requires = "end_time")]
        start_time: Option<TimeOfDay>,
        /// Listings must end at or before this time (HH:MM)
        #[arg(long, requires = "start_time")]
        end_time: Option<TimeOfDay>,
    },
    /// Check a proposed listing or rule for conflicts; exits with 1 on conflict
    Check {
        /// JSON of a new single listing or a new recurrence rule
        #[arg(long)]
        candidate: String,
        /// JSON array of the teacher's single listings
        #[arg(long)]
        singles: Option<String>,
        /// JSON array of the teacher's recurrence rules
        #[arg(long)]
        rules: Option<String>,
        /// JSON array of exclusions on those rules
        #[arg(long)]
        exclusions: Option<String>,
        /// Only report overlaps with listings of the same sport
        #[arg(long)]
        same_skill: bool,
    },
    /// Convert a time between HH:MM and h:mm AM/PM
    Time {
        value: String,
        /// Parse a display time and print it as HH:MM
        #[arg(long)]
        to_24h: bool,
    },
}

/// A candidate file holds either draft; rules are recognised by their weekday.
#[derive(Deserialize)]
#[serde(untagged)]
enum CandidateFile {
    Rule(NewRecurrenceRule),
    Single(NewSlot),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")?;

    match cli.command {
        Commands::Expand {
            rules,
            exclusions,
            today,
            output,
        } => {
            let rules: Vec<RecurrenceRule> = read_json(Some(&rules))?;
            let index = load_exclusions(exclusions.as_deref())?;
            let today = today.unwrap_or_else(|| chrono::Local::now().date_naive());

            let mut listings = expand_all(&rules, &index, today);
            slot_engine::model::sort_chronologically(&mut listings);
            debug!(rules = rules.len(), listings = listings.len(), %today, "expanded rules");

            let json = serde_json::to_string_pretty(&listings)?;
            write_output(output.as_deref(), &json)?;
        }
        Commands::Filter {
            input,
            from,
            to,
            skill,
            min_price,
            max_price,
            start_time,
            end_time,
        } => {
            let listings: Vec<Listing> = read_json(input.as_deref())?;
            let criteria = FilterCriteria {
                date_range: from.zip(to),
                skill,
                min_price,
                max_price,
                time_range: start_time.zip(end_time),
            };

            let kept = filter_listings(&listings, &criteria);
            debug!(input = listings.len(), kept = kept.len(), "filtered listings");
            println!("{}", serde_json::to_string_pretty(&kept)?);
        }
        Commands::Check {
            candidate,
            singles,
            rules,
            exclusions,
            same_skill,
        } => {
            let mut policy = load_config(cli.config.as_deref())?.conflict_policy();
            if same_skill {
                policy.scope = ConflictScope::SameSkill;
            }

            let candidate = match read_json::<CandidateFile>(Some(&candidate))? {
                CandidateFile::Rule(rule) => {
                    rule.validate().context("Invalid candidate rule")?;
                    Candidate::from(&rule)
                }
                CandidateFile::Single(slot) => {
                    slot.validate().context("Invalid candidate listing")?;
                    Candidate::from(&slot)
                }
            };
            let singles: Vec<Slot> = read_optional_json(singles.as_deref())?;
            let rules: Vec<RecurrenceRule> = read_optional_json(rules.as_deref())?;
            let index = load_exclusions(exclusions.as_deref())?;

            let conflicts = find_conflicts(&candidate, &singles, &rules, &index, policy);
            if conflicts.is_empty() {
                println!("No conflicts");
            } else {
                for conflict in &conflicts {
                    println!("Conflict: {}", conflict);
                }
                process::exit(1);
            }
        }
        Commands::Time { value, to_24h } => {
            if to_24h {
                let time = to_24_hour(&value).with_context(|| format!("Invalid display time: {}", value))?;
                println!("{}", time);
            } else {
                let time = parse_time(&value).with_context(|| format!("Invalid time: {}", value))?;
                println!("{}", format_display(time));
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let json = read_input(Some(path))?;
            EngineConfig::from_json(&json).with_context(|| format!("Invalid config file: {}", path))
        }
        None => EngineConfig::from_env().context("Invalid SLOTS_* environment"),
    }
}

fn load_exclusions(path: Option<&str>) -> Result<ExclusionIndex> {
    let exclusions: Vec<Exclusion> = read_optional_json(path)?;
    Ok(exclusions.into_iter().collect())
}

fn read_optional_json<T: DeserializeOwned>(path: Option<&str>) -> Result<Vec<T>> {
    match path {
        Some(_) => read_json(path),
        None => Ok(Vec::new()),
    }
}

fn read_json<T: DeserializeOwned>(path: Option<&str>) -> Result<T> {
    let raw = read_input(path)?;
    let source = path.unwrap_or("stdin");
    if raw.trim().is_empty() {
        bail!("No JSON input in {}", source);
    }
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse JSON from {}", source))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
