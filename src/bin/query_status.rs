use clap::Parser;
use npbc::{
    Controller, StatusRecord, embassy_sync::blocking_mutex::raw::NoopRawMutex,
    serial::TokioDelay,
};
use std::{error::Error, fmt::Display};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port path
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,
}

fn named<T: Display>(name: Option<T>, raw: u8) -> String {
    name.map_or_else(|| format!("Unknown ({raw:#04x})"), |name| name.to_string())
}

fn print_status(rec: &StatusRecord) {
    println!("Firmware version:   {}", rec.version);
    println!("Controller time:    {}", rec.timestamp);
    println!("Mode:               {}", named(rec.mode(), rec.mode));
    println!("Priority:           {}", named(rec.priority(), rec.state));
    println!("Status:             {}", named(rec.burner_status(), rec.status));
    println!("Power:              {}", named(rec.power_level(), rec.power));
    println!("Alarms:             {}", rec.alarms);
    println!("Outputs:            {}", rec.outputs);
    println!("Set temperature:    {}", rec.set_temperature);
    println!("Boiler temperature: {}", rec.boiler_temperature);
    println!("DHW temperature:    {}", rec.dhw_temperature);
    println!("Flame:              {}", rec.flame);
    println!("Fan:                {}", rec.fan);
    println!("Thermostat stop:    {}", rec.thermostat_stop);
    println!("Feeder work time:   {}", rec.feeder_work_time);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();

    let port = npbc::serial::open(&args.port)?;
    let ctrl = Controller::<NoopRawMutex, _, _>::new(port, TokioDelay);
    let rec = ctrl
        .query_status()
        .await
        .ok_or("Failed to query burner status")?;

    print_status(&rec);

    Ok(())
}
