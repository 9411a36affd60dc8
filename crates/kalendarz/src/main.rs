use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod data;
mod grid;
mod html;
mod order;
mod selection;
mod server;
mod text;
mod types;

use config::Settings;
use html::{Page, Theme};
use order::HttpOrderClient;
use selection::SelectionController;
use types::{DateKey, YearMonth};

#[derive(Parser, Debug)]
#[command(name = "kalendarz")]
#[command(about = "Month calendar for picking and ordering offer days")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON file with offer and order days (overrides KALENDARZ_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Order endpoint (overrides KALENDARZ_ORDER_URL)
    #[arg(long, global = true)]
    order_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Date whose month is shown first (YYYY-MM-DD format)
        /// Default: today
        #[arg(long)]
        from: Option<NaiveDate>,
    },

    /// Print a month grid to the terminal
    Show {
        /// Month to show (YYYY-MM format)
        /// Default: current month
        #[arg(long, short)]
        month: Option<YearMonth>,

        /// Terminal width; each column is width / 7
        #[arg(long, short, default_value = "42")]
        width: usize,
    },

    /// Write a static HTML page for a month (no server)
    Build {
        /// Month to render (YYYY-MM format)
        /// Default: current month
        #[arg(long, short)]
        month: Option<YearMonth>,

        /// Output file
        #[arg(long, short, default_value = "index.html")]
        output: PathBuf,
    },

    /// Place an order for a date
    Order {
        /// Date to order (YYYY-MM-DD format)
        date: DateKey,
    },
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse()?)
        .add_directive("tower_http=warn".parse()?);

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = Settings::from_env().context("Failed to load settings")?;
    if let Some(path) = &args.data_file {
        settings.data_file = path.clone();
    }
    if let Some(url) = &args.order_url {
        settings.order_url = url.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;

    let settings = load_settings(&args)?;
    let today = Local::now().date_naive();

    match args.command {
        // Default to serve if no command specified
        None => serve_command(&settings, 8080, today).await?,
        Some(Commands::Serve { port, from }) => {
            serve_command(&settings, port, from.unwrap_or(today)).await?
        }
        Some(Commands::Show { month, width }) => {
            let month = month.unwrap_or_else(|| YearMonth::of(today));
            let marked = data::load_marked_dates(&settings.data_file)?;
            let controller = SelectionController::new(month.first_day());
            let weeks = controller.grid(&marked, today);
            print!("{}", text::render_text(month, &weeks, None, width));
        }
        Some(Commands::Build { month, output }) => {
            let month = month.unwrap_or_else(|| YearMonth::of(today));
            let marked = data::load_marked_dates(&settings.data_file)?;
            let controller = SelectionController::new(month.first_day());
            let weeks = controller.grid(&marked, today);
            let page = Page {
                month,
                weeks: &weeks,
                selected: None,
                submitting: false,
                notice: None,
                interactive: false,
            };
            html::generate_html(&page, &Theme::default(), &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "HTML saved");
        }
        Some(Commands::Order { date }) => order_command(&settings, date).await?,
    }

    Ok(())
}

async fn serve_command(settings: &Settings, port: u16, from: NaiveDate) -> Result<()> {
    let marked = data::load_marked_dates(&settings.data_file)?;
    info!(
        offers = marked.offer_days.len(),
        orders = marked.order_days.len(),
        file = %settings.data_file.display(),
        "Marked dates loaded"
    );

    let orders = HttpOrderClient::new(&settings.order_url, settings.request_timeout)
        .context("Failed to create HTTP client")?;
    info!(url = %orders.url(), "Orders go to");

    let state = server::AppState::new(from, marked, orders, settings.data_file.clone());
    server::serve(port, state).await
}

async fn order_command(settings: &Settings, date: DateKey) -> Result<()> {
    let client = HttpOrderClient::new(&settings.order_url, settings.request_timeout)
        .context("Failed to create HTTP client")?;

    let mut controller = SelectionController::new(date.date());
    controller.select_day(date);

    let Some(result) = controller.confirm_order(&client).await else {
        return Ok(());
    };
    println!("{}", order::notice(&result));

    if let Err(e) = result {
        error!(date = %date, error = %e, "Order failed");
        return Err(e.into());
    }
    Ok(())
}
