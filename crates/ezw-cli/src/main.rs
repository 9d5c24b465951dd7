use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ezw_booking::{
    submit_today, summary_location, CodecConfig, RandomIdGenerator, SummaryRenderer,
    SummaryState, TransferCodec,
};
use ezw_catalog::{CatalogProvider, StaticCatalog};
use ezw_core::{estimate, BookingDraft, UrgencyTier};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ezw-cli")]
#[command(about = "EZ Work service marketplace command-line interface")]
struct Cli {
    /// Directory holding catalog.yaml, labels.yaml and assets/.
    #[arg(long, env = "EZW_WORKSPACE_ROOT", default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the web front end.
    Serve,
    /// Print the estimated cost range for an urgency tier.
    Estimate {
        #[arg(default_value = "medium")]
        urgency: UrgencyTier,
    },
    /// Validate a booking and print its order-summary link.
    Book {
        #[arg(long)]
        worker: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        time: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        urgency: Option<UrgencyTier>,
    },
    /// Decode a booking token and print the confirmation.
    Summary { token: String },
    /// List services and workers.
    Catalog,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let codec = TransferCodec::new(CodecConfig::from_env());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let mut config = ezw_web::WebConfig::from_env();
            config.workspace_root = cli.root;
            ezw_web::serve(config).await?;
        }
        Commands::Estimate { urgency } => {
            println!("{urgency}: {}", estimate(urgency));
        }
        Commands::Book {
            worker,
            date,
            time,
            location,
            description,
            urgency,
        } => {
            let catalog = StaticCatalog::from_workspace_root(&cli.root)?;
            let mut draft = BookingDraft::for_worker(worker)
                .with_date(date)
                .with_time(time)
                .with_location(location)
                .with_description(description);
            draft.urgency = urgency;
            let request = submit_today(&draft, &catalog).context("booking rejected")?;
            let token = codec
                .encode(&request)
                .context("booking too large for a summary link")?;
            info!(worker_id = request.worker_id(), "booking token issued");
            println!("estimated cost: {}", request.estimated_cost());
            println!("token: {token}");
            println!("summary: {}", summary_location(&token));
        }
        Commands::Summary { token } => {
            let catalog = StaticCatalog::from_workspace_root(&cli.root)?;
            let ids = RandomIdGenerator;
            let renderer = SummaryRenderer::new(&catalog, &ids, codec);
            match renderer.render(Some(token.as_str())) {
                SummaryState::Confirmed(c) => {
                    println!("booking id: {}", c.booking_id);
                    println!("worker: {} ({})", c.worker.name, c.service_name());
                    println!(
                        "when: {} at {}",
                        c.scheduled_date_display(),
                        c.scheduled_time
                    );
                    println!("where: {}", c.location);
                    println!("work: {}", c.description);
                    println!("urgency: {}", c.urgency);
                    println!("service cost: {}", c.base_cost);
                    if c.fee_applied() {
                        println!("platform fee: {}", c.platform_fee);
                    }
                    println!("total: {}", c.total_cost_display());
                }
                SummaryState::NotFound(reason) => {
                    bail!("no booking found ({reason}); browse services to start over")
                }
                SummaryState::Loading => bail!("summary did not resolve"),
            }
        }
        Commands::Catalog => {
            let catalog = StaticCatalog::from_workspace_root(&cli.root)?;
            for service in catalog.list_service_categories() {
                let workers = catalog.list_workers(Some(&service.key));
                println!("{} [{}] - {} worker(s)", service.display_name, service.key, workers.len());
                for w in workers {
                    println!(
                        "  #{} {} * {} {} {}",
                        w.id,
                        w.name,
                        w.rating,
                        w.price_range,
                        if w.available { "available" } else { "unavailable" }
                    );
                }
            }
        }
    }

    Ok(())
}
