use log::{error, info};
use p1meter::config::SourceConfig;
use p1meter::pipeline::{pump, ChannelSource};
use p1meter::{Config, Pipeline, RegistrationTable, SensorSink};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use std::{env, io};
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;

async fn spawn_source(source: &SourceConfig, sender: Sender<Vec<u8>>) -> io::Result<JoinHandle<io::Result<u64>>> {
    match source {
        SourceConfig::Stdin => {
            info!("Reading telegrams from stdin");
            Ok(tokio::spawn(pump(tokio::io::stdin(), sender)))
        }
        SourceConfig::File { path } => {
            info!("Reading telegrams from {path}");
            let file = tokio::fs::File::open(path).await?;
            Ok(tokio::spawn(pump(file, sender)))
        }
        #[cfg(feature = "serial")]
        SourceConfig::Serial { port, baud_rate } => {
            use tokio_serial::SerialPortBuilderExt;
            info!("Reading telegrams from {port} at {baud_rate} baud");
            let stream = tokio_serial::new(port, *baud_rate).open_native_async().map_err(io::Error::from)?;
            Ok(tokio::spawn(pump(stream, sender)))
        }
        #[cfg(not(feature = "serial"))]
        SourceConfig::Serial { port, .. } => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("Serial port {port} needs a build with the `serial` feature"),
        )),
    }
}

fn log_report(pipeline: &Pipeline, sensors: &[Arc<SensorSink>]) {
    match serde_json::to_string(pipeline.stats()) {
        Ok(stats) => info!("Statistics: {stats}"),
        Err(e) => error!("Unable to serialize statistics: {e}"),
    }

    let mut snapshot = serde_json::Map::new();
    for sensor in sensors {
        let state = serde_json::to_value(sensor.snapshot()).unwrap_or_default();
        snapshot.insert(sensor.name().to_string(), state);
    }
    info!("Sensors: {}", serde_json::Value::Object(snapshot));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    let default_filter = env::var("P1_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    let config_path = env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    config.log_summary();

    let mut builder = RegistrationTable::builder();
    let mut sensors = Vec::new();
    for (code, sensor) in config.build_sensors()? {
        builder.register(code, sensor.clone());
        sensors.push(sensor);
    }
    let mut pipeline = Pipeline::new(config.pipeline.to_pipeline_config(), Arc::new(builder.build()));

    let (sender, receiver) = mpsc::channel(64);
    let pump_task = spawn_source(&config.source, sender).await?;
    let mut source = ChannelSource::new(receiver);

    let mut poll = tokio::time::interval(config.pipeline.poll_interval());
    let mut report = tokio::time::interval(config.report_interval());
    // Skip the immediate first tick, nothing to report yet
    report.tick().await;

    info!("Waiting for telegrams");
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if pipeline.poll(&mut source, Instant::now()).is_source_closed() {
                    break;
                }
            }
            _ = report.tick() => log_report(&pipeline, &sensors),
        }
    }

    log_report(&pipeline, &sensors);
    match pump_task.await {
        Ok(Ok(total)) => info!("Read {total} bytes in total"),
        Ok(Err(e)) => error!("Reading the byte source failed: {e}"),
        Err(e) => error!("Reader task failed: {e}"),
    }
    Ok(())
}
