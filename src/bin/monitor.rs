use clap::Parser;
use log::{info, warn};
use npbc::{
    Controller, embassy_sync::blocking_mutex::raw::NoopRawMutex, serial::TokioDelay,
};
use std::{error::Error, time::Duration};
use tokio::time::{self, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port path
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Polling interval in seconds
    #[arg(short, long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    let port = npbc::serial::open(&args.port)?;
    let ctrl = Controller::<NoopRawMutex, _, _>::new(port, TokioDelay);
    let mut interval = time::interval(Duration::from_secs(args.interval));

    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let Some(rec) = ctrl.query_status().await else {
            warn!("Status unavailable this cycle");
            continue;
        };

        info!(
            "mode={} state={} status={} power={} boiler={} dhw={} set={} flame={} fan={} outputs={} alarms={} thermostat_stop={}",
            rec.mode,
            rec.state,
            rec.status,
            rec.power,
            rec.boiler_temperature,
            rec.dhw_temperature,
            rec.set_temperature,
            rec.flame,
            rec.fan,
            rec.outputs,
            rec.alarms,
            rec.thermostat_stop,
        );
    }
}
