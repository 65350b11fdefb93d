use std::{env, time::Duration};

use async_trait::async_trait;
use dotenv::dotenv;
use mysql_async::{prelude::Queryable, Opts, Params, Pool, Value};
use tokio::time::timeout;
use tracing::error;

pub fn connection_string() -> Result<String, env::VarError> {
    dotenv().ok();
    let connection = env::var("DATABASE_URL")?;
    Ok(connection)
}

#[derive(thiserror::Error, Debug)]
pub enum MysqlConnectionError {
    #[error("The database connection string is wrong please check your environment: {0}")]
    DatabaseConnectionConfigWrong(#[from] env::VarError),

    #[error("Could not parse connection string make sure it is correctly formatted")]
    CouldNotParseConnectionString,

    #[error("Can not connect to the database please make sure your connection string is correct")]
    CanNotConnectToDatabase,
}

#[derive(thiserror::Error, Debug)]
pub enum MysqlError {
    #[error("MySQL error: {0}")]
    MysqlError(#[from] mysql_async::Error),
}

/// Executes one parameterized statement. The bulk upsert coordinator talks to
/// the database only through this seam, so it can be driven in tests without
/// a server.
#[async_trait]
pub trait UpsertExecutor: Send + Sync {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, MysqlError>;
}

pub struct MysqlClient {
    pool: Pool,
}

impl MysqlClient {
    pub async fn new() -> Result<Self, MysqlConnectionError> {
        let connection_str = connection_string()?;
        let opts = Opts::from_url(&connection_str)
            .map_err(|_| MysqlConnectionError::CouldNotParseConnectionString)?;

        let pool = Pool::new(opts);

        // Perform a direct connection test before handing the pool out
        match timeout(Duration::from_millis(5000), pool.get_conn()).await {
            Ok(Ok(mut conn)) => {
                if conn.query_drop("SELECT 1").await.is_err() {
                    return Err(MysqlConnectionError::CanNotConnectToDatabase);
                }
            }
            Ok(Err(e)) => {
                error!("Error connecting to database: {}", e);
                return Err(MysqlConnectionError::CanNotConnectToDatabase);
            }
            Err(e) => {
                error!("Timeout connecting to database: {}", e);
                return Err(MysqlConnectionError::CanNotConnectToDatabase);
            }
        }

        Ok(MysqlClient { pool })
    }

    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, MysqlError> {
        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(sql, Params::Positional(params)).await?;
        Ok(conn.affected_rows())
    }

    pub async fn disconnect(self) -> Result<(), MysqlError> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

#[async_trait]
impl UpsertExecutor for MysqlClient {
    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64, MysqlError> {
        MysqlClient::execute(self, sql, params).await
    }
}
