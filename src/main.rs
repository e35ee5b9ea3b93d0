use clap::{Arg, Command};
use log::LevelFilter;
use mailrisk::executor::{ActionRecord, ActionSink, IdempotencyLedger};
use mailrisk::rules::validate_rules;
use mailrisk::{Enrichment, EngineConfig, FieldRegistry, RawEmail, RiskEngine, RuleSet};
use serde::Deserialize;
use std::process;

/// Email file format for the CLI: the raw message plus whatever
/// enrichment the caller pre-fetched.
#[derive(Debug, Deserialize)]
struct EmailFile {
    #[serde(default)]
    id: Option<String>,
    email: RawEmail,
    #[serde(default)]
    enrichment: Enrichment,
}

/// Dry-run sink: logs every action instead of performing it. Real sinks
/// belong to the embedding application.
struct LogSink;

impl ActionSink for LogSink {
    fn mark_as_reviewed(&self, email_id: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] markAsReviewed {email_id}");
        Ok(())
    }
    fn add_label(&self, email_id: &str, label: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] addLabel {email_id} label={label}");
        Ok(())
    }
    fn move_to_folder(&self, email_id: &str, folder: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] moveToFolder {email_id} folder={folder}");
        Ok(())
    }
    fn send_report_now(&self, email_id: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] sendReportNow {email_id}");
        Ok(())
    }
    fn notify_user(&self, email_id: &str, channel: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] notifyUser {email_id} channel={channel}");
        Ok(())
    }
    fn increase_retention(&self, email_id: &str, days: u32) -> anyhow::Result<()> {
        log::info!("[dry-run] increaseRetention {email_id} days={days}");
        Ok(())
    }
    fn delete_email(&self, email_id: &str) -> anyhow::Result<()> {
        log::info!("[dry-run] deleteEmail {email_id}");
        Ok(())
    }
}

fn main() {
    let matches = Command::new("mailrisk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Deterministic email risk scoring and rule evaluation engine")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Engine configuration file (YAML); defaults are used when omitted"),
        )
        .arg(
            Arg::new("rules")
                .short('r')
                .long("rules")
                .value_name("FILE")
                .help("Rule set file (YAML)"),
        )
        .arg(
            Arg::new("email")
                .short('e')
                .long("email")
                .value_name("FILE")
                .help("Email file (JSON: raw message plus pre-fetched enrichment)"),
        )
        .arg(
            Arg::new("ledger")
                .long("ledger")
                .value_name("FILE")
                .help("Prior actionsTaken records (JSON) used as the idempotency ledger"),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate configuration and rules, then exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default engine configuration and exit"),
        )
        .arg(
            Arg::new("generate-rules")
                .long("generate-rules")
                .value_name("FILE")
                .help("Write a sample rule set and exit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = EngineConfig::default().to_file(path) {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
        println!("Default configuration written to {path}");
        return;
    }

    if let Some(path) = matches.get_one::<String>("generate-rules") {
        if let Err(e) = RuleSet::default().to_file(path) {
            eprintln!("Error writing rule set: {e}");
            process::exit(1);
        }
        println!("Sample rule set written to {path}");
        return;
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => match EngineConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e}");
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let rule_set = match matches.get_one::<String>("rules") {
        Some(path) => match RuleSet::from_file(path) {
            Ok(rule_set) => rule_set,
            Err(e) => {
                eprintln!("Error loading rules: {e}");
                process::exit(1);
            }
        },
        None => RuleSet { rules: Vec::new() },
    };

    if matches.get_flag("test-config") {
        if let Err(e) = config.validate() {
            eprintln!("Configuration invalid: {e}");
            process::exit(1);
        }
        if let Err(e) = validate_rules(&rule_set.rules, FieldRegistry::global()) {
            eprintln!("Rules invalid: {e}");
            process::exit(1);
        }
        println!(
            "Configuration valid ({} rule(s) loaded)",
            rule_set.rules.len()
        );
        return;
    }

    let email_path = match matches.get_one::<String>("email") {
        Some(path) => path,
        None => {
            eprintln!("No email file given; use --email FILE (or --generate-config / --generate-rules)");
            process::exit(1);
        }
    };

    if let Err(e) = run(&config, &rule_set, email_path, matches.get_one::<String>("ledger")) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(
    config: &EngineConfig,
    rule_set: &RuleSet,
    email_path: &str,
    ledger_path: Option<&String>,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(email_path)?;
    let email_file: EmailFile = serde_json::from_str(&content)?;
    let email_id = email_file.id.unwrap_or_else(|| email_path.to_string());

    let ledger = match ledger_path {
        Some(path) => {
            let records: Vec<ActionRecord> =
                serde_json::from_str(&std::fs::read_to_string(path)?)?;
            IdempotencyLedger::from_records(&records)
        }
        None => IdempotencyLedger::new(),
    };

    let engine = RiskEngine::new(config.clone())?;
    let (analyzed, result) = engine.evaluate(
        &email_id,
        &email_file.email,
        &email_file.enrichment,
        &rule_set.rules,
        &LogSink,
        &ledger,
    );

    let output = serde_json::json!({
        "analyzed": analyzed,
        "result": result,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
