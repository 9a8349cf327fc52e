pub mod channels;
pub mod command;
pub mod config;
pub mod coordinator;
pub mod datalog_writer;
pub mod device;
pub mod error;
pub mod options;
pub mod poller;
pub mod prelude;
pub mod register;

const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::coordinator::Coordinator;
use crate::datalog_writer::DatalogWriter;
use crate::device::Session;

use std::io::Write;

fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .init();
}

/// Runs the operation named on the command line against the configured
/// inverter, returning it to idle before exiting. A message on `shutdown_rx`
/// interrupts the operation.
pub async fn app(mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
    let options = Options::new();
    let command = Command::try_from(options.operation)?;

    let config = Config::new(options.config_file.clone());
    init_logging(config.as_ref().map(|c| c.loglevel()).unwrap_or("info"));
    let config = config.with_context(|| format!("failed to load config {}", options.config_file))?;

    info!("sun2000-control {} starting: {}", CARGO_PKG_VERSION, command.name());
    config.log_summary();

    let channels = Channels::new();

    let datalog_handle = match config.datalog_file() {
        Some(path) => {
            let writer = DatalogWriter::new(path)?;
            let receiver = channels.reports.subscribe();
            Some(tokio::spawn(async move { writer.run(receiver).await }))
        }
        None => None,
    };

    let session = Session::connect(&config).await?;
    match config.credential() {
        Some(credential) => session.authenticate(&credential).await?,
        None if config.endpoint().is_serial() => {
            info!("{}: serial transport, no login needed", config.endpoint())
        }
        None => warn!(
            "{}: no password configured, writes may be refused",
            config.endpoint()
        ),
    }

    let device: Arc<dyn Device> = Arc::new(session);
    let mut coordinator = Coordinator::new(config.clone(), device, channels.clone());

    let result = tokio::select! {
        result = command.run(&mut coordinator) => result,
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received, returning to idle");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("{} failed: {:#}", command.name(), e);
    }

    if let Err(e) = coordinator.close().await {
        error!("Failed to return to idle: {:#}", e);
    }

    channels.shutdown();
    if let Some(handle) = datalog_handle {
        match handle.await {
            Ok(Err(e)) => error!("Datalog writer failed: {}", e),
            Err(e) => error!("Error waiting for datalog writer: {}", e),
            Ok(Ok(())) => {}
        }
    }

    info!("Shutdown complete");

    result
}
