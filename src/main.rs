use std::env;
use std::path::Path;

use tagboard::app;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    // Defaults match the original deployment: dashboard and API on one
    // address, database file under data/.
    let mut addr = "127.0.0.1:8000".to_string();
    let mut db_path = "data/tags.db".to_string();

    if args.len() >= 2 {
        addr = args[1].clone();
    }
    if args.len() >= 3 {
        db_path = args[2].clone();
    }

    if let Some(parent) = Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Start the web application
    app::run(&addr, &db_path).await?;

    Ok(())
}
