use clap::Parser;
use eyre::Result;
use sqlx::{Connection, PgConnection};

use crate::opts::DbOpts;

#[derive(Parser)]
pub struct Args {
    #[clap(flatten)]
    pub db: DbOpts,
}

/// Verify connectivity to the database.
///
/// Prints the outcome either way; a failed connection is reported, not
/// raised, so the process still exits cleanly.
pub async fn check(args: Args) -> Result<()> {
    match server_version(&args.db).await {
        Ok(version) => println!("Connected to: {version}"),
        Err(err) => println!("Connection failed: {err}"),
    }
    Ok(())
}

async fn server_version(db: &DbOpts) -> Result<String, sqlx::Error> {
    let mut conn = PgConnection::connect(&db.database_url()).await?;
    let version: String = sqlx::query_scalar("SELECT version()")
        .fetch_one(&mut conn)
        .await?;
    // Connectivity is already proven at this point; ignore a noisy close.
    drop(conn.close().await);
    Ok(version)
}
