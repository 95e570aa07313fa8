//! Runs the BABY model and prints vial activities and cumulative release.
//!
//! ```text
//! cargo run -p tritium-breeder --example baby -- crates/breeder/examples/baby.toml
//! ```
//!
//! Set `RUST_LOG=debug` to follow rotations as they happen.

use std::{env, error::Error};

use tracing_subscriber::EnvFilter;
use tritium_breeder::{BreederConfig, Recorder};
use tritium_solvers::transient::ssprk22;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match env::args().nth(1) {
        Some(path) => BreederConfig::load(path)?,
        None => BreederConfig::default(),
    };
    let network = config.network()?;

    let mut recorder = Recorder::new(&network);
    let solution = ssprk22::solve(&network, config.horizon(), &mut recorder)?;
    if let Some(error) = recorder.error() {
        return Err(error.clone().into());
    }

    println!(
        "{} steps ({} rejected), {} rotations",
        solution.steps,
        solution.rejected,
        solution.rotations.len()
    );

    for probe in ["iv_vials", "ov_vials", "cumulative_release", "baby_inventory"] {
        println!("{probe}:");
        for trace in recorder.traces().iter().filter(|t| t.probe == probe) {
            println!("  {:<12} {:>14.6e}", trace.label, trace.last().unwrap_or(0.0));
        }
    }

    Ok(())
}
