use std::fs::File;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod columns;
mod config;
mod controller;
mod domain;
mod fetcher;
mod grid;
mod inputter;
mod model;
mod paginator;
mod record;
mod render;
mod ui;
mod views;

use config::Args;
use controller::Controller;
use domain::{TVConfig, TVError};
use fetcher::{Fetcher, HttpTransport};
use model::{Model, Status};
use ui::TVUI;

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn initialize_logging(cfg: &TVConfig) -> Result<(), TVError> {
    let log_file = File::create(&cfg.log_file)?;
    let filter = EnvFilter::try_new(&cfg.log_level).map_err(|e| TVError::Logging(e.to_string()))?;
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter),
        )
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| TVError::Logging(e.to_string()))
}

fn run() -> Result<(), TVError> {
    let args = Args::parse();
    let cfg = config::resolve(&args)?;
    initialize_logging(&cfg)?;
    info!("Starting tvgrid with {cfg:?}");

    let transport = HttpTransport::new(&cfg.server, Duration::from_millis(cfg.timeout_ms))?;
    let host = transport.host();
    let fetcher = Fetcher::new(Arc::new(transport));

    let mut model = Model::init(&cfg, host, &fetcher)?;
    let ui = TVUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &fetcher, &ui, &controller);
    ratatui::restore();

    info!("Bye");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    fetcher: &Fetcher,
    ui: &TVUI,
    controller: &Controller,
) -> Result<(), TVError> {
    while model.status != Status::QUITTING {
        for completion in fetcher.poll() {
            model.complete(completion, fetcher);
        }

        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(Some(message), fetcher)?;
        };
    }
    Ok(())
}
