use std::fs::File;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod controller;
mod domain;
mod filter;
mod inputter;
mod loader;
mod model;
mod record;
mod scroll;
mod sort;
mod source;
mod store;
mod ui;
mod view;

use controller::Controller;
use domain::{PAGE_SIZE, RVConfig, RVError, TABLE_LOOKAHEAD_ROWS};
use model::{Model, Status};
use source::FileSource;
use ui::TableUI;

#[derive(Parser, Debug)]
#[command(
    name = "rankview",
    version,
    about = "Browse a ranked record set page by page, sort and filter it in the terminal."
)]
struct Args {
    /// Record document (.json, .csv, .parquet, .arrow)
    path: String,

    /// Records revealed per page
    #[arg(long, default_value_t = PAGE_SIZE)]
    page_size: usize,

    /// Rows before the end of the view at which the next page is loaded
    #[arg(long, default_value_t = TABLE_LOOKAHEAD_ROWS)]
    lookahead: usize,

    /// Maximum width of a table column
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll: u64,

    /// Log file, the terminal itself is used by the ui
    #[arg(long, default_value = "rankview.log")]
    log_file: String,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_tracing(&args) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(&args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_tracing(args: &Args) -> Result<(), RVError> {
    let log_path = shellexpand::tilde(&args.log_file);
    let log_file = File::create(&*log_path)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .map_err(|e| RVError::LoadingFailed(format!("invalid log filter: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(log_file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: &Args) -> Result<(), RVError> {
    info!("Starting rankview on {}", args.path);

    let cfg = RVConfig::default()
        .with_page_size(args.page_size)
        .with_scroll_lookahead(args.lookahead)
        .with_max_column_width(args.max_column_width)
        .with_event_poll_time(args.poll);

    let source = FileSource::new(&args.path)?;
    // Fail before taking over the terminal when the file is obviously wrong
    source.probe()?;

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, Box::new(source), size.width as usize, size.height as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        let message = controller.handle_event(&model)?;
        model.update(message);
    }

    let state = model.loader().state();
    info!(
        "Leaving with {} records loaded (exhausted: {})",
        state.loaded_count, state.exhausted
    );
    Ok(())
}
