//! Showroom command line
//!
//! `showroom query <vehicles.json> <message.json>` runs one offload message.
//! `showroom sync [config.json]` flushes the offline favorite queue once.

use showroom::{
    NAME, OffloadWorker, Result, ServiceWorker, ShowroomConfig, ShowroomError, VERSION,
};
use std::env;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("query") if args.len() == 4 => run_query(&args[2], &args[3]),
        Some("sync") => run_sync(args.get(2).map(String::as_str)),
        _ => {
            print_usage();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("{} v{}", NAME, VERSION);
    println!();
    println!("Usage:");
    println!("  showroom query <vehicles.json> <message.json>");
    println!("  showroom sync [config.json]");
}

/// Merge the vehicle list into the message payload and run it on a worker
fn run_query(vehicles_path: &str, message_path: &str) -> Result<()> {
    let vehicles: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(vehicles_path)?)?;
    let mut message: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(message_path)?)?;

    if let Some(payload) = message.get_mut("payload").and_then(|p| p.as_object_mut()) {
        payload.insert("vehicles".to_string(), vehicles);
    }

    let worker = OffloadWorker::spawn()?;
    worker.post_message(message)?;
    let response = worker.recv_message()?;

    println!("{}", serde_json::to_string_pretty(&response.to_json())?);
    Ok(())
}

fn run_sync(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => ShowroomConfig::from_file(path)?,
        None => ShowroomConfig::default(),
    }
    .with_env();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let worker = ServiceWorker::from_config(config)?;
        let tag = worker.config().sync_tag.clone();
        let outcome = worker.handle_sync(&tag).await;
        println!("{:?}", outcome);
        Ok::<_, ShowroomError>(())
    })
}
