use aether_core::config::header_from_overrides;
use aether_core::constants::DEFAULT_DATA_DIR;
use aether_core::{
    CoreConfig, FileSource, IngestionOrchestrator, LogSource, RecordStore, SubjectMatch,
};
use aether_ids::IdGenerator;
use clap::{Parser, Subcommand};
use fhir::Resource;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "aether")]
#[command(about = "Aether intake pipeline CLI")]
struct Cli {
    /// Directory holding the record collections (defaults to AETHER_DATA_DIR, then ./aether_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Ingestion source recorded in log entries (HL7v2, GoogleForms, ExternalXML, WearableAPI)
    #[arg(long, global = true)]
    source: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a CSV export (first line is the header)
    Ingest {
        /// Path to the CSV file
        file: PathBuf,
    },
    /// List all patients
    Patients,
    /// Show one patient resource
    Patient {
        /// Patient id, e.g. p-1234
        id: String,
        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
        /// Print a FHIR collection bundle with the patient's encounters and observations
        #[arg(long, conflicts_with = "yaml")]
        bundle: bool,
    },
    /// List encounters for a patient
    Encounters {
        id: String,
        /// Match any subject reference containing the id
        #[arg(long)]
        contains: bool,
    },
    /// List observations for a patient
    Observations {
        id: String,
        /// Match any subject reference containing the id
        #[arg(long)]
        contains: bool,
    },
    /// Show the ingestion log, newest first
    Logs,
    /// Count patients per triage level
    Summary,
    /// Clear every collection and reseed the demo patient
    Reset,
    /// Encode one CSV row against a header and print the wire message
    Encode {
        /// Header line, e.g. "Timestamp,Full Name,MRN,Triage"
        header: String,
        /// Data line
        row: String,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aether_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("AETHER_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let source = match cli.source.as_deref() {
        Some(name) => LogSource::parse(name)
            .ok_or_else(|| anyhow::anyhow!("unknown ingestion source '{name}'"))?,
        None => LogSource::default(),
    };
    let header = header_from_overrides(
        std::env::var("AETHER_SENDING_APP").ok(),
        std::env::var("AETHER_SENDING_FACILITY").ok(),
    );
    let config = CoreConfig::new(Some(data_dir), header, source)?;

    let Some(command) = cli.command else {
        println!("Use 'aether --help' for commands");
        return Ok(());
    };

    let now = chrono::Utc::now();
    let mut store = config.open_store(now)?;

    match command {
        Commands::Ingest { file } => {
            let mut orchestrator = IngestionOrchestrator::new(&config, IdGenerator::default());
            match orchestrator.ingest(&mut store, &FileSource::new(&file)) {
                Ok(count) => println!("Synced {} records from {}", count, file.display()),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Commands::Patients => {
            let patients = store.patients();
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                let name = patient
                    .primary_name()
                    .map(|n| n.display())
                    .unwrap_or_default();
                println!(
                    "ID: {}, Name: {}, Triage: {}, Version: {}",
                    patient.id,
                    name,
                    patient.triage_level().unwrap_or("-"),
                    patient.version()
                );
            }
        }
        Commands::Patient { id, bundle: true, .. } => match store.patient_bundle(&id) {
            Some(bundle) => println!("{}", bundle.to_json()?),
            None => eprintln!("No patient with id {}", id),
        },
        Commands::Patient { id, yaml, .. } => match store.patient(&id) {
            Some(patient) if yaml => print!("{}", patient.to_yaml()?),
            Some(patient) => println!("{}", patient.to_json()?),
            None => eprintln!("No patient with id {}", id),
        },
        Commands::Encounters { id, contains } => {
            let encounters = store.encounters_for(&id, subject_match(contains));
            if encounters.is_empty() {
                println!("No encounters found.");
            }
            for encounter in encounters {
                println!(
                    "ID: {}, Status: {:?}, Start: {}, Reason: {}",
                    encounter.id,
                    encounter.status,
                    encounter
                        .period
                        .as_ref()
                        .map(|p| p.start.to_rfc3339())
                        .unwrap_or_default(),
                    encounter.reason().unwrap_or("-")
                );
            }
        }
        Commands::Observations { id, contains } => {
            let observations = store.observations_for(&id, subject_match(contains));
            if observations.is_empty() {
                println!("No observations found.");
            }
            for observation in observations {
                let (value, unit) = observation
                    .value_quantity
                    .as_ref()
                    .map(|q| (q.value.to_string(), q.unit.as_str()))
                    .unwrap_or_default();
                println!(
                    "ID: {}, Code: {}, Value: {} {}, At: {}",
                    observation.id,
                    observation.primary_code().unwrap_or("-"),
                    value,
                    unit,
                    observation.effective_date_time.to_rfc3339()
                );
            }
        }
        Commands::Logs => print_logs(&store),
        Commands::Summary => {
            let summary = store.triage_summary();
            println!("P1: {}", summary.p1);
            println!("P2: {}", summary.p2);
            println!("P3: {}", summary.p3);
            println!("P4: {}", summary.p4);
            println!("Unknown: {}", summary.unknown);
            println!("Total: {}", summary.total());
        }
        Commands::Reset => {
            store.reset(now)?;
            println!("Store reset; demo patient restored.");
        }
        Commands::Encode { header, row } => {
            let mut orchestrator = IngestionOrchestrator::new(&config, IdGenerator::default());
            let message = orchestrator.preview(&header, &row)?;
            for segment in message.segments() {
                println!("{}", segment);
            }
        }
    }

    Ok(())
}

fn subject_match(contains: bool) -> SubjectMatch {
    if contains {
        SubjectMatch::Contains
    } else {
        SubjectMatch::Exact
    }
}

fn print_logs(store: &RecordStore) {
    let logs = store.logs();
    if logs.is_empty() {
        println!("No ingestion logs.");
    }
    for log in logs {
        println!(
            "{} [{:?}] {} {} {}",
            log.timestamp.to_rfc3339(),
            log.status,
            log.source,
            log.id,
            log.patient_reference.as_deref().unwrap_or("-")
        );
        if log.raw_snippet.contains('\r') {
            for line in log.raw_snippet.split('\r') {
                println!("    {}", line);
            }
        } else {
            println!("    {}", log.raw_snippet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_patient_yaml_flag() {
        let cli = Cli::try_parse_from(["aether", "patient", "p-1234", "--yaml"]).unwrap();
        match cli.command {
            Some(Commands::Patient { id, yaml, bundle }) => {
                assert_eq!(id, "p-1234");
                assert!(yaml);
                assert!(!bundle);
            }
            _ => panic!("expected patient command"),
        }
    }

    #[test]
    fn parses_patient_bundle_flag() {
        let cli = Cli::try_parse_from(["aether", "patient", "p-1234", "--bundle"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Patient { bundle: true, yaml: false, .. })));

        let both = Cli::try_parse_from(["aether", "patient", "p-1234", "--bundle", "--yaml"]);
        assert!(both.is_err());
    }

    #[test]
    fn global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["aether", "logs", "--data-dir", "/tmp/x"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }

    #[test]
    fn contains_flag_selects_loose_matching() {
        assert_eq!(subject_match(true), SubjectMatch::Contains);
        assert_eq!(subject_match(false), SubjectMatch::Exact);
    }
}
