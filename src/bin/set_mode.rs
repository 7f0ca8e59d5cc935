use clap::{Parser, builder::PossibleValuesParser};
use npbc::{
    Controller, Mode, Priority, embassy_sync::blocking_mutex::raw::NoopRawMutex,
    serial::TokioDelay,
};
use std::error::Error;
use strum::VariantNames;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial port path
    #[arg(short, long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Operating mode
    #[arg(short, long, value_parser = PossibleValuesParser::new(Mode::VARIANTS))]
    mode: String,

    /// Heating circuit priority
    #[arg(short = 'r', long, value_parser = PossibleValuesParser::new(Priority::VARIANTS))]
    priority: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Args::parse();
    let mode: Mode = args
        .mode
        .parse()
        .map_err(|_| format!("Unknown mode: {}", args.mode))?;
    let priority: Priority = args
        .priority
        .parse()
        .map_err(|_| format!("Unknown priority: {}", args.priority))?;

    let port = npbc::serial::open(&args.port)?;
    let ctrl = Controller::<NoopRawMutex, _, _>::new(port, TokioDelay);

    if !ctrl
        .set_mode_and_priority(mode as u8, priority as u8)
        .await
    {
        return Err(format!("Burner did not acknowledge {mode}, {priority}").into());
    }

    println!("Burner set to {mode}, {priority}");

    Ok(())
}
