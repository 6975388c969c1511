use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, Subcommand};
use tracing::info;

use exam_entry::config::Settings;
use exam_entry::db::{self, ImportKind};
use exam_entry::models::normalize_email;
use exam_entry::report;
use exam_entry::{logging, Dataset, EligibilityEvaluator, VerificationResult};

#[derive(Parser)]
#[command(name = "exam-entry")]
#[command(about = "Exam entry eligibility checks for scanned exam passes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the reference dataset
    Seed,
    /// Import one dataset from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: ImportKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Verify a scanned exam id for a student
    #[command(group(
        ArgGroup::new("source")
            .args(["data_dir", "reference"])
            .multiple(false)
    ))]
    Verify {
        #[arg(long)]
        exam: String,
        #[arg(long)]
        email: String,
        /// Directory holding exams.csv, registrations.csv, attendance.csv, fee_status.csv
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Use the built-in reference dataset
        #[arg(long)]
        reference: bool,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown eligibility report for a student
    #[command(group(
        ArgGroup::new("source")
            .args(["data_dir", "reference"])
            .multiple(false)
    ))]
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        reference: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Exit status of `verify` when the scan is rejected.
const REJECTED_STATUS: u8 = 2;

fn verdict_status(result: &VerificationResult) -> u8 {
    if result.success() {
        0
    } else {
        REJECTED_STATUS
    }
}

/// Where verify/report read records from when not using Postgres.
fn local_dataset(data_dir: Option<&PathBuf>, reference: bool) -> anyhow::Result<Option<Dataset>> {
    if reference {
        return Ok(Some(Dataset::reference()?));
    }
    match data_dir {
        Some(dir) => Ok(Some(Dataset::from_csv_dir(dir)?)),
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    logging::init(&settings.logging.level)?;

    match cli.command {
        Commands::InitDb => {
            let pool = db::connect(&settings.database).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = db::connect(&settings.database).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { kind, csv } => {
            let pool = db::connect(&settings.database).await?;
            let written = db::import_csv(&pool, kind, &csv).await?;
            println!("Wrote {written} rows from {}.", csv.display());
        }
        Commands::Verify {
            exam,
            email,
            data_dir,
            reference,
            json,
        } => {
            let email = normalize_email(&email);
            let dataset = match local_dataset(data_dir.as_ref(), reference)? {
                Some(dataset) => dataset,
                None => {
                    let pool = db::connect(&settings.database).await?;
                    db::load_snapshot(&pool, &exam, &email).await?
                }
            };

            let result = EligibilityEvaluator::over(&dataset).evaluate(&exam, &email)?;
            info!(exam_id = %exam, student_email = %email, decision = %result.kind(), "scan verified");

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match &result {
                    VerificationResult::Eligible(details) => println!(
                        "Access granted: welcome to the {} exam. Room: {}.",
                        details.course_title, details.room
                    ),
                    VerificationResult::Rejected(rejection) => {
                        println!("Access denied: {rejection}")
                    }
                }
            }

            return Ok(ExitCode::from(verdict_status(&result)));
        }
        Commands::Report {
            email,
            data_dir,
            reference,
            out,
        } => {
            let email = normalize_email(&email);
            let dataset = match local_dataset(data_dir.as_ref(), reference)? {
                Some(dataset) => dataset,
                None => {
                    let pool = db::connect(&settings.database).await?;
                    db::load_student_snapshot(&pool, &email).await?
                }
            };

            let evaluator = EligibilityEvaluator::over(&dataset);
            let verdicts = report::evaluate_all(&evaluator, &dataset.exams, &email)?;
            let report = report::build_report(&email, &verdicts);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_scans_exit_with_rejection_status() {
        let dataset = Dataset::reference().unwrap();
        let evaluator = EligibilityEvaluator::over(&dataset);

        let admitted = evaluator
            .evaluate("exam_cs101_midterm_fall2025", "test@university.edu.pk")
            .unwrap();
        assert_eq!(verdict_status(&admitted), 0);

        let rejected = evaluator
            .evaluate("exam_ma201_final_fall2025", "test@university.edu.pk")
            .unwrap();
        assert_eq!(verdict_status(&rejected), REJECTED_STATUS);
    }

    #[test]
    fn verify_arguments_parse() {
        let cli = Cli::try_parse_from([
            "exam-entry",
            "verify",
            "--exam",
            "exam_cs101_midterm_fall2025",
            "--email",
            "test@university.edu.pk",
            "--reference",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Verify { reference: true, .. }));
    }
}
