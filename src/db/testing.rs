//! In-memory stores for tests. Each pool holds a single connection so the
//! in-memory database lives as long as the pool.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use super::Databases;

async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite")
}

/// Order store with the tables the order service owns.
pub async fn source_pool() -> SqlitePool {
    let pool = memory_pool().await;
    sqlx::raw_sql(
        r#"
        CREATE TABLE orders (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at   TEXT    NOT NULL,
            status       TEXT    NOT NULL,
            table_id     INTEGER NOT NULL DEFAULT 1,
            total_amount REAL,
            user_id      INTEGER NOT NULL DEFAULT 1
        );
        CREATE TABLE order_items (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id    INTEGER NOT NULL,
            item_name  TEXT    NOT NULL,
            quantity   INTEGER NOT NULL,
            unit_price REAL    NOT NULL,
            order_id   INTEGER NOT NULL REFERENCES orders (id)
        );
        "#,
    )
    .execute(&pool)
    .await
    .expect("source schema");
    pool
}

/// Analytics store with migrations applied.
pub async fn analytics_pool() -> SqlitePool {
    let pool = memory_pool().await;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("analytics migrations");
    pool
}

pub async fn databases() -> Databases {
    Databases::new(source_pool().await, analytics_pool().await)
}

pub async fn insert_order(pool: &SqlitePool, created_at: &str, status: &str, amount: f64) -> i64 {
    sqlx::query("INSERT INTO orders (created_at, status, total_amount) VALUES (?, ?, ?)")
        .bind(created_at)
        .bind(status)
        .bind(amount)
        .execute(pool)
        .await
        .expect("insert order")
        .last_insert_rowid()
}

pub async fn insert_order_item(
    pool: &SqlitePool,
    order_id: i64,
    item_id: i64,
    item_name: &str,
    quantity: i64,
    unit_price: f64,
) {
    sqlx::query(
        "INSERT INTO order_items (item_id, item_name, quantity, unit_price, order_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(item_id)
    .bind(item_name)
    .bind(quantity)
    .bind(unit_price)
    .bind(order_id)
    .execute(pool)
    .await
    .expect("insert order item");
}
