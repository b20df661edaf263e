#![forbid(unsafe_code)]

use std::env;
use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use bolt_tools::cli::{execute_command, USAGE};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().ok_or_else(|| USAGE.to_string())?.as_str();

    let generation = match args.iter().position(|a| a == "--generation") {
        Some(i) => Some(
            args.get(i + 1)
                .ok_or_else(|| USAGE.to_string())?
                .parse::<u32>()
                .map_err(|_| USAGE.to_string())?,
        ),
        None => None,
    };

    let mut raw_json = String::new();
    std::io::stdin()
        .read_to_string(&mut raw_json)
        .map_err(|e| e.to_string())?;

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let output = execute_command(command, generation, &raw_json, now_ms)?;
    println!("{output}");
    Ok(())
}
