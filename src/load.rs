use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::Result;
use itertools::multizip;
use sqlx::{Acquire, PgPool, Postgres};
use tracing::{info, instrument};

use crate::errors::LoadError;
use crate::opts::DbOpts;
use crate::records::{read_reviews, ReviewRecord};

pub const INSERT_CHUNK_SIZE: usize = 10000;

#[derive(Parser)]
pub struct Args {
    #[clap(flatten)]
    pub db: DbOpts,
    /// Path to the schema definition (DDL) file.
    #[clap(long, default_value = "sqls/schema.sql")]
    pub schema: PathBuf,
    /// Path to the reviews CSV file.
    #[clap(long, default_value = "data/reviews.csv")]
    pub csv: PathBuf,
}

pub async fn load(args: Args) -> Result<()> {
    // Both inputs are local files; read and validate them up front so a
    // missing path or a bad value surfaces before the first store
    // interaction.
    let schema = read_schema(&args.schema)?;
    let reviews = read_reviews(&args.csv)?;

    let pool = PgPool::connect(&args.db.database_url())
        .await
        .map_err(LoadError::Storage)?;

    apply_schema(&schema, &pool).await?;
    upsert_reviews(&reviews, &pool).await?;

    info!(rows = reviews.len(), path = %args.csv.display(), "loaded reviews");
    info!("done");
    Ok(())
}

/// Read the schema DDL from disk. Purely local, no store interaction.
///
/// # Errors
/// Returns `MissingResource` if the schema file cannot be located.
pub fn read_schema(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|_| LoadError::MissingResource {
        kind: "schema file",
        path: path.to_path_buf(),
    })
}

/// Execute the schema DDL so the target table exists.
///
/// Safe to call repeatedly as long as the DDL is written as
/// create-if-not-exists.
///
/// # Errors
/// Returns `MissingResource` if the schema file cannot be located, `Storage`
/// if the store rejects the DDL.
#[instrument(skip(db))]
pub async fn ensure_schema<'a>(
    path: &Path,
    db: impl Acquire<'a, Database = Postgres>,
) -> Result<(), LoadError> {
    let sql = read_schema(path)?;
    apply_schema(&sql, db).await
}

/// Execute schema DDL, possibly several statements, in one transaction.
///
/// # Errors
/// Returns `Storage` if the store rejects the DDL.
#[instrument(skip_all)]
pub async fn apply_schema<'a>(
    sql: &str,
    db: impl Acquire<'a, Database = Postgres>,
) -> Result<(), LoadError> {
    let mut txn = db.begin().await?;
    sqlx::raw_sql(sql).execute(&mut *txn).await?;
    txn.commit().await?;

    info!("schema created/verified");
    Ok(())
}

/// Read, coerce and bulk-upsert every row of the CSV file into `reviews`.
///
/// # Errors
/// Returns `MissingResource` if the CSV path does not exist, `TypeCoercion`
/// if a `created_at` or `rating` value cannot be parsed (both before any
/// store write), and `Storage` if the transaction cannot commit.
#[instrument(skip(db))]
pub async fn load_reviews<'a>(
    path: &Path,
    db: impl Acquire<'a, Database = Postgres>,
) -> Result<(), LoadError> {
    let reviews = read_reviews(path)?;
    upsert_reviews(&reviews, db).await?;

    info!(rows = reviews.len(), path = %path.display(), "loaded reviews");
    Ok(())
}

/// Bulk-upsert coerced review rows into `reviews`, keyed on `id`.
///
/// Rows are staged into `tmp_reviews` first, then merged in a single
/// set-based statement. Staging, merge and the final staging drop all run
/// inside one transaction, so a failed load leaves the target table exactly
/// as it was. Upserting the same rows twice yields the same table state as
/// doing it once.
///
/// # Errors
/// Returns `Storage` if the transaction cannot commit.
#[instrument(skip_all)]
pub async fn upsert_reviews<'a>(
    reviews: &[ReviewRecord],
    db: impl Acquire<'a, Database = Postgres>,
) -> Result<(), LoadError> {
    let (mut ids, mut created, mut users, mut regions, mut ratings, mut texts) =
        (vec![], vec![], vec![], vec![], vec![], vec![]);
    for review in reviews {
        ids.push(review.id.clone());
        created.push(review.created_at);
        users.push(review.user_id.clone());
        regions.push(review.region.clone());
        ratings.push(review.rating);
        texts.push(review.text.clone());
    }

    let mut txn = db.begin().await?;

    // Replace any staging table a previous (possibly aborted) run left behind.
    sqlx::query("DROP TABLE IF EXISTS tmp_reviews")
        .execute(&mut *txn)
        .await?;
    sqlx::query(include_str!("../sqls/create_staging.sql"))
        .execute(&mut *txn)
        .await?;

    let mut staged = 0u64;
    for (is, cs, us, res, ras, ts) in multizip((
        ids.chunks(INSERT_CHUNK_SIZE),
        created.chunks(INSERT_CHUNK_SIZE),
        users.chunks(INSERT_CHUNK_SIZE),
        regions.chunks(INSERT_CHUNK_SIZE),
        ratings.chunks(INSERT_CHUNK_SIZE),
        texts.chunks(INSERT_CHUNK_SIZE),
    )) {
        let result = sqlx::query(include_str!("../sqls/insert_staging.sql"))
            .bind(is)
            .bind(cs)
            .bind(us)
            .bind(res)
            .bind(ras)
            .bind(ts)
            .execute(&mut *txn)
            .await?;
        staged += result.rows_affected();
    }

    let upserted = sqlx::query(include_str!("../sqls/upsert_reviews.sql"))
        .execute(&mut *txn)
        .await?
        .rows_affected();

    // Same transaction scope as the merge; the staging table never outlives
    // the load.
    sqlx::query("DROP TABLE tmp_reviews").execute(&mut *txn).await?;

    txn.commit().await?;

    info!(staged, upserted, "merged staged reviews into target table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{load, read_schema, Args};
    use crate::errors::LoadError;
    use crate::opts::DbOpts;

    // TEST-NET-1, never routable. A regression that contacts the store
    // before validating paths hangs on this address until the pool times
    // out and then fails the variant assertion.
    fn unroutable_db() -> DbOpts {
        DbOpts {
            db_user: "swarm_user".into(),
            db_password: "swarm_pass".into(),
            db_host: "192.0.2.1".into(),
            db_port: 1,
            db_name: "swarm_main".into(),
            db_url: None,
        }
    }

    #[test]
    fn must_report_missing_schema_file() {
        let err = read_schema(Path::new("/nonexistent/schema.sql")).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingResource { kind: "schema file", .. }
        ));
    }

    #[tokio::test]
    async fn must_report_missing_schema_before_store_interaction() {
        let args = Args {
            db: unroutable_db(),
            schema: PathBuf::from("/nonexistent/schema.sql"),
            csv: PathBuf::from("data/reviews.csv"),
        };

        let err = load(args).await.unwrap_err();
        let err = err.downcast::<LoadError>().expect("loader error");
        assert!(matches!(
            err,
            LoadError::MissingResource { kind: "schema file", .. }
        ));
    }

    #[tokio::test]
    async fn must_report_missing_csv_before_store_interaction() {
        let args = Args {
            db: unroutable_db(),
            schema: PathBuf::from("sqls/schema.sql"),
            csv: PathBuf::from("/nonexistent/reviews.csv"),
        };

        let err = load(args).await.unwrap_err();
        let err = err.downcast::<LoadError>().expect("loader error");
        assert!(matches!(
            err,
            LoadError::MissingResource { kind: "CSV file", .. }
        ));
    }
}
