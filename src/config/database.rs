use sqlx::{migrate::MigrateError, mysql::MySqlPoolOptions, MySql, Pool};

pub type DbPool = Pool<MySql>;

pub async fn init_db(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    MySqlPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database_url)
        .await
}

pub async fn run_migrations(db: &DbPool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(db).await
}
