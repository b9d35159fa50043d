use ancesta::cache::{schema, CacheDb};
use ancesta::Config;
use anyhow::Result;
use clap::Parser;
use rusqlite::params;

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Search cached individuals by name or alias")]
struct Args {
    /// Partial name to search for (case-insensitive)
    name: String,

    /// Maximum number of matches to print
    #[arg(short, long, default_value_t = 20)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();
    let config = Config::load()?;
    log::info!("Cache database: {}", config.cache_db_path().display());

    let db = CacheDb::new(config.cache_db_path());
    let needle = args.name.clone();
    let limit = args.limit;

    let matches = db
        .with_connection(move |conn| {
            schema::ensure_schema(conn)?;
            let pattern = format!("%{}%", needle);
            let mut stmt = conn.prepare(
                "SELECT id, name, description, alias FROM individuals \
                 WHERE name LIKE ?1 COLLATE NOCASE OR alias LIKE ?1 COLLATE NOCASE \
                 ORDER BY name LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![pattern, limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
            Ok(rows)
        })
        .await?;

    if matches.is_empty() {
        println!("No cached individuals match \"{}\".", args.name);
        return Ok(());
    }

    println!("Matches for \"{}\":\n", args.name);
    for (id, name, description, alias) in &matches {
        print!("{}  {}", id, name);
        if let Some(alias) = alias {
            print!(" ({})", alias);
        }
        if let Some(description) = description {
            if !description.is_empty() {
                print!(" - {}", description);
            }
        }
        println!();
    }
    println!("\n{} match(es).", matches.len());

    Ok(())
}
