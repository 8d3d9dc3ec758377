mod seed;

use clap::{Parser, Subcommand};
use odyssey_core::config::{database_name_from_env_value, store_backend_from_env_value};
use odyssey_core::records::ShipmentStatus;
use odyssey_core::repositories::shipments::ShipmentQuery;
use odyssey_core::store::INDEX_PLAN;
use odyssey_core::{open_store, CoreConfig, ShipmentService};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "odyssey")]
#[command(about = "Odyssey clinical-trial logistics CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert the demo data set into an empty database
    Seed,
    /// Create the unique and secondary indexes
    EnsureIndexes,
    /// Failure descriptors across all shipments, most frequent first
    FailureAnalytics {
        /// Only shipments of this trial
        #[arg(long)]
        trial_id: Option<String>,
    },
    /// Status summary, failure breakdown and monthly trend
    ShipmentAnalytics {
        /// Only shipments of this trial
        #[arg(long)]
        trial_id: Option<String>,
    },
    /// Show one shipment with its trial, sites and kit
    Shipment {
        /// Tracking number
        tracking: String,
    },
    /// List shipments
    ListShipments {
        /// PENDING, IN_TRANSIT, DELIVERED or CANCELLED
        #[arg(long)]
        status: Option<ShipmentStatus>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn config_from_env() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let store_backend = store_backend_from_env_value(std::env::var("ODYSSEY_STORE").ok())?;
    let database_name = database_name_from_env_value(std::env::var("ODYSSEY_DB_NAME").ok());
    Ok(CoreConfig::new(
        store_backend,
        std::env::var("MONGODB_URI").ok(),
        database_name,
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("odyssey=warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'odyssey --help' for commands");
        return Ok(());
    };

    // Opening the store also applies the index plan.
    let store = open_store(&config_from_env()?).await?;
    let shipments = ShipmentService::new(store.clone());

    match command {
        Commands::Seed => match seed::seed(store).await {
            Ok(summary) => {
                for (collection, count) in summary {
                    println!("Inserted {count} documents into {collection}");
                }
            }
            Err(e) => eprintln!("Error seeding database: {e}"),
        },
        Commands::EnsureIndexes => {
            println!("Ensured {} indexes", INDEX_PLAN.len());
        }
        Commands::FailureAnalytics { trial_id } => {
            let query = ShipmentQuery {
                trial_id,
                ..ShipmentQuery::default()
            };
            let rows = shipments.failure_analytics(&query).await?;
            if rows.is_empty() {
                println!("No failures recorded.");
            }
            for row in rows {
                println!("{:>5}  {}  ({})", row.count, row.failure, row.shipments.join(", "));
            }
        }
        Commands::ShipmentAnalytics { trial_id } => {
            let query = ShipmentQuery {
                trial_id,
                ..ShipmentQuery::default()
            };
            print_json(&shipments.analytics(&query).await?)?;
        }
        Commands::Shipment { tracking } => match shipments.details(&tracking).await {
            Ok(details) => print_json(&details)?,
            Err(e) => eprintln!("Error: {e}"),
        },
        Commands::ListShipments { status } => {
            let query = ShipmentQuery {
                status,
                ..ShipmentQuery::default()
            };
            let found = shipments.list(&query).await?;
            if found.is_empty() {
                println!("No shipments found.");
            }
            for shipment in found {
                println!(
                    "{}  {}  {} -> {}  failures: {}",
                    shipment.tracking_number,
                    shipment.status,
                    shipment.origin,
                    shipment.destination,
                    shipment.failures.len()
                );
            }
        }
    }

    Ok(())
}
