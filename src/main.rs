mod config;
mod display;
mod error;
mod export;
mod parser;
mod placement;
mod room;
mod web;

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{RunConfig, CONFIG_FILE};
use display::print_plan_summary;
use export::export_plan;
use parser::{find_roster_files, load_roster};
use placement::plan_seating;

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_tracing();

    // Check if we should run in web mode
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "web" {
        let port = args.get(2)
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);
        let folder = PathBuf::from(args.get(3).map(String::as_str).unwrap_or("."));
        let password = std::env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| "admin123".to_string()); // Default password, change this!
        let config = RunConfig::load(&folder.join(CONFIG_FILE))?;

        println!("Starting web server on port {}...", port);
        println!("Rooms: {}", config.rooms.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(", "));
        println!("Access the site at http://localhost:{}", port);

        web::start_server(port, password, config, Some(folder)).await?;
        return Ok(());
    }

    // CLI mode: seat every roster found in the folder
    let folder = PathBuf::from(args.get(1).map(String::as_str).unwrap_or("."));
    let config = RunConfig::load(&folder.join(CONFIG_FILE))?;

    println!("Loading rooms...");
    let catalog = config.build_catalog()?;
    println!(
        "Loaded {} rooms with {} seats",
        catalog.len(),
        catalog.total_capacity()
    );

    println!("Loading rosters from {}...", folder.display());
    let files = find_roster_files(&folder)?;
    let roster = load_roster(&files)?;
    println!("Loaded {} students from {} files (duplicates removed)", roster.len(), files.len());

    println!("\n=== Running Seat Allocation ===");
    let plan = plan_seating(&config, roster, catalog)?;
    print_plan_summary(&plan);

    println!("\n=== Writing Seating Plan to Files ===");
    let prefix = config.output_prefix(&folder);
    let written = export_plan(&plan, &prefix)?;
    println!("Seating plan saved to:");
    for path in written {
        println!("  - {}", path.display());
    }

    Ok(())
}
