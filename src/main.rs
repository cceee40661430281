use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use triage_feed::{
    TriageError,
    api::FeedbackApi,
    cli::{Args, Command},
    client::FeedbackFeedClient,
    config::Config,
    events::{ClientEvent, create_event_channel},
    formatter::RecordFormatter,
    monitoring::{HealthStatus, setup_metrics},
    tracing_setup::setup_tracing,
    types::{CreateFeedbackRequest, FeedbackFilters, TriageSummary},
    ui::{UIController, UIOptions},
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    setup_tracing(&args.log_level, args.json_logs)?;
    info!("Starting triage feed client v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args)?;

    if config.metrics.enabled {
        setup_metrics(config.metrics.port).await?;
    }

    let outcome = match args.command {
        Command::Watch {
            filters,
            max_records,
        } => watch(&config, FeedbackFilters::from(&filters), max_records).await,
        Command::List {
            filters,
            limit,
            skip,
        } => list(&config, FeedbackFilters::from(&filters), limit, skip).await,
        Command::Get { id } => get(&config, &id).await,
        Command::Submit {
            name,
            email,
            message,
        } => submit(&config, CreateFeedbackRequest::new(name, email, message)).await,
    };

    match outcome {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // Request failures are reported with the server's detail, not a backtrace.
        Err(e @ (TriageError::Api { .. } | TriageError::InvalidRequest(_))) => {
            formatter(&config).print_status("ERROR", &e.to_string());
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!("Triage feed client error: {}", e);
            Err(e.into())
        }
    }
}

fn formatter(config: &Config) -> RecordFormatter {
    RecordFormatter::new(
        config.output.format.clone(),
        config.output.colored,
        config.output.quiet,
    )
}

async fn watch(config: &Config, filters: FeedbackFilters, max_records: u64) -> Result<(), TriageError> {
    let (event_sender, event_receiver) = create_event_channel();

    let client = FeedbackFeedClient::new(config.feed.clone()).with_events(event_sender.clone());
    let records = event_sender.clone();
    let subscription = client.subscribe(move |record| {
        let _ = records.try_send(ClientEvent::RecordReceived(record));
    });

    let mut ui = UIController::new(
        event_receiver,
        config.output.format.clone(),
        UIOptions {
            colored: config.output.colored,
            quiet: config.output.quiet,
            filters,
            max_records,
        },
    );

    let started = chrono::Utc::now();
    client.connect();
    info!("Watching {}. Press Ctrl+C to stop...", config.feed.endpoint()?);

    let shutdown = client.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            shutdown.disconnect();
            let _ = event_sender.send(ClientEvent::Stopping).await;
        }
    });

    let summary = ui.run().await;
    ctrl_c.abort();
    subscription.unsubscribe();
    let health = HealthStatus::from_stats(&client.stats(), chrono::Utc::now() - started);
    client.disconnect();
    info!("Live feed health at exit: {}", health.to_json());

    info!("Watch finished after {} records", summary.total);
    Ok(())
}

async fn list(config: &Config, filters: FeedbackFilters, limit: u32, skip: u32) -> Result<(), TriageError> {
    let api = FeedbackApi::new(&config.api)?;
    let page = api.list(&filters, limit, skip).await?;

    let mut formatter = formatter(config);
    formatter.print_header();
    for record in &page.feedbacks {
        formatter.print_record(record);
    }
    formatter.print_summary(&TriageSummary::from_records(&page.feedbacks));
    formatter.print_status(
        "INFO",
        &format!(
            "Showing {} of {} records (skip {})",
            page.feedbacks.len(),
            page.total,
            skip
        ),
    );
    Ok(())
}

async fn get(config: &Config, id: &str) -> Result<(), TriageError> {
    let api = FeedbackApi::new(&config.api)?;
    let record = api.get(id).await?;
    formatter(config).print_detail(&record);
    Ok(())
}

async fn submit(config: &Config, request: CreateFeedbackRequest) -> Result<(), TriageError> {
    let api = FeedbackApi::new(&config.api)?;
    let record = api.create(&request).await?;

    let formatter = formatter(config);
    formatter.print_status("OK", &format!("Feedback {} submitted", record.id));
    formatter.print_detail(&record);
    Ok(())
}
