use sqlx::Row;
use xml_unpack::infra::config::{self, IngestConfig};
use xml_unpack::{DocumentSource, LocalDirSource, PgSession};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--skip-database]\n\
         \n\
         Reads env vars:\n\
           DATABASE_URL, XML_SOURCE_DIR, XML_FILE_EXTENSION, XML_ROOT_ELEMENT,\n\
           XML_ROOT_TABLE, XML_DRY_RUN, DATABASE_MAX_CONNECTIONS\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let skip_database = args.iter().any(|a| a == "--skip-database");

    // Force-read config (nice error messages if something is off)
    let config = IngestConfig::from_env()?;

    println!("> Preflight:");
    println!("  XML_SOURCE_DIR={}", config.source_dir.display());
    println!("  XML_FILE_EXTENSION={}", config.extension);
    println!("  XML_ROOT_ELEMENT={}", config.root_element);
    println!("  XML_ROOT_TABLE={}", config.root_table);
    println!("  XML_DRY_RUN={}", config.dry_run);

    // Documents the next run would pick up.
    let source = LocalDirSource::new(config.source_dir.clone(), config.extension.clone());
    let documents = source.list_documents().await?;
    println!("  Documents found: {}", documents.len());
    for doc in documents.iter().take(10) {
        println!("    {}", doc);
    }
    if documents.len() > 10 {
        println!("    ... and {} more", documents.len() - 10);
    }

    if config.dry_run || skip_database {
        println!("  Skipping database checks.");
        println!("> Preflight OK.");
        return Ok(());
    }

    let session = PgSession::connect(&config::database_url()?, config.max_connections).await?;
    let pool = session.pool();

    let version: String = sqlx::query_scalar("SELECT version()").fetch_one(pool).await?;
    println!("  Database: {}", version);

    // The ledger table must already exist; this tool never creates schema.
    let ledger = sqlx::query("SELECT to_regclass($1)::text AS ledger")
        .bind(config.root_table.as_str())
        .fetch_one(pool)
        .await?;
    let ledger_name: Option<String> = ledger.try_get("ledger")?;
    match ledger_name {
        Some(name) => {
            let sql = format!("SELECT count(*) AS count FROM {}", config.root_table);
            let count: i64 = sqlx::query(&sql).fetch_one(pool).await?.try_get("count")?;
            println!("  Ledger table {} exists ({} documents ingested).", name, count);
        }
        None => {
            return Err(anyhow::anyhow!(
                "Ledger table `{}` does not exist. Create the target schema before ingesting.",
                config.root_table
            ));
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
