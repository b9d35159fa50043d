use ancesta::cache::{schema, CacheDb};
use ancesta::Config;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match command {
        "verify" => {
            run_cache_verification().await?;
        }
        "help" | _ => {
            print_help();
        }
    }

    Ok(())
}

fn print_help() {
    println!("ancesta v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("USAGE:");
    println!("    ancesta <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    verify    Open the relationship cache and verify its schema");
    println!("    help      Print this message");
    println!();
    println!("Name search and kinship resolution live in the `lookup` and");
    println!("`kinship` binaries.");
}

/// Open the cache database, apply the schema, and sanity-check it.
async fn run_cache_verification() -> Result<()> {
    log::info!("ancesta v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    log::info!("Cache database: {}", config.cache_db_path().display());

    let db = CacheDb::new(config.cache_db_path());
    db.with_connection(|conn| {
        schema::ensure_schema(conn)?;

        if !schema::schema_ok(conn)? {
            return Err(ancesta::AncestaError::Config(
                "cache schema incomplete after apply".to_string(),
            ));
        }
        log::debug!("✓ Cache tables present");

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(ancesta::AncestaError::Config(format!(
                "journal mode is not WAL: {}",
                journal_mode
            )));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(ancesta::AncestaError::Config(format!(
                "integrity check failed: {}",
                integrity
            )));
        }
        log::info!("✓ Cache integrity: OK");

        Ok(())
    })
    .await?;

    log::info!("✓ Cache verification complete");
    Ok(())
}
