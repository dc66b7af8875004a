use anyhow::Result;
use std::path::PathBuf;

mod merge;
mod sweep;
mod verify;

use merge::SeriesKind;

fn print_usage() {
    println!("☀️  Capture Pipeline - batch tools around capture_engine");
    println!();
    println!("Usage:");
    println!("  --merge <glob> <out.csv> [price|pv]   Merge yearly files into one series");
    println!("  --verify <glob> [price|pv]            Check inputs for duplicates, gaps and ordering");
    println!("  --sweep <prices> <pv> [timezone]      Battery sizing sweep, writes battery_sweep.csv");
    println!();
    println!("Example: --merge 'prices/*.csv' prices_all.csv price");
}

fn main() -> Result<()> {
    env_logger::init();

    // Set Rayon to use all available cores
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_cpus::get())
        .build_global()
    {
        log::warn!("Could not configure thread pool: {}", e);
    }

    let args: Vec<String> = std::env::args().collect();
    let arg = |idx: usize| args.get(idx).map(String::as_str);

    match arg(1) {
        Some("--merge") if args.len() > 3 => {
            let kind = SeriesKind::parse(arg(4))?;
            merge::run_merge(&args[2], &PathBuf::from(&args[3]), kind)?;
        }
        Some("--verify") if args.len() > 2 => {
            let kind = SeriesKind::parse(arg(3))?;
            verify::run_verify(&args[2], kind)?;
        }
        Some("--sweep") if args.len() > 3 => {
            println!("Using {} CPU cores", rayon::current_num_threads());
            sweep::run_sweep(&PathBuf::from(&args[2]), &PathBuf::from(&args[3]), arg(4))?;
        }
        _ => print_usage(),
    }

    Ok(())
}
