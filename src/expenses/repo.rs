use sqlx::{FromRow, PgPool};
use time::Date;
use uuid::Uuid;

use crate::expenses::repo_types::{Category, Expense, NewExpense};
use crate::money::Cents;

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub category: Option<Category>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
}

pub async fn list(
    db: &PgPool,
    owner: Uuid,
    filter: ListFilter,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Expense>> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, user_id, title, amount_cents, category, description, date,
               is_recurring, recurring_interval, tags, attachments, created_at, updated_at
        FROM expenses
        WHERE user_id = $1
          AND ($2::expense_category IS NULL OR category = $2)
          AND ($3::date IS NULL OR date >= $3)
          AND ($4::date IS NULL OR date <= $4)
        ORDER BY date DESC, created_at DESC
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(owner)
    .bind(filter.category)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await
}

/// Count and amount sum over the whole filtered set, independent of the
/// pagination window.
pub async fn totals(db: &PgPool, owner: Uuid, filter: ListFilter) -> sqlx::Result<(i64, Cents)> {
    sqlx::query_as::<_, (i64, Cents)>(
        r#"
        SELECT COUNT(*), CAST(COALESCE(SUM(amount_cents), 0) AS BIGINT)
        FROM expenses
        WHERE user_id = $1
          AND ($2::expense_category IS NULL OR category = $2)
          AND ($3::date IS NULL OR date >= $3)
          AND ($4::date IS NULL OR date <= $4)
        "#,
    )
    .bind(owner)
    .bind(filter.category)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_one(db)
    .await
}

/// Unscoped lookup; handlers check ownership after existence so NotFound
/// takes precedence over Forbidden.
pub async fn find(db: &PgPool, id: Uuid) -> sqlx::Result<Option<Expense>> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, user_id, title, amount_cents, category, description, date,
               is_recurring, recurring_interval, tags, attachments, created_at, updated_at
        FROM expenses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn insert(db: &PgPool, owner: Uuid, new: NewExpense) -> sqlx::Result<Expense> {
    sqlx::query_as::<_, Expense>(
        r#"
        INSERT INTO expenses (user_id, title, amount_cents, category, description, date,
                              is_recurring, recurring_interval, tags, attachments)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id, user_id, title, amount_cents, category, description, date,
                  is_recurring, recurring_interval, tags, attachments, created_at, updated_at
        "#,
    )
    .bind(owner)
    .bind(new.title)
    .bind(new.amount_cents)
    .bind(new.category)
    .bind(new.description)
    .bind(new.date)
    .bind(new.is_recurring)
    .bind(new.recurring_interval)
    .bind(new.tags)
    .bind(sqlx::types::Json(new.attachments))
    .fetch_one(db)
    .await
}

pub async fn update(db: &PgPool, id: Uuid, new: NewExpense) -> sqlx::Result<Expense> {
    sqlx::query_as::<_, Expense>(
        r#"
        UPDATE expenses
        SET title = $2, amount_cents = $3, category = $4, description = $5, date = $6,
            is_recurring = $7, recurring_interval = $8, tags = $9, attachments = $10,
            updated_at = now()
        WHERE id = $1
        RETURNING id, user_id, title, amount_cents, category, description, date,
                  is_recurring, recurring_interval, tags, attachments, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(new.title)
    .bind(new.amount_cents)
    .bind(new.category)
    .bind(new.description)
    .bind(new.date)
    .bind(new.is_recurring)
    .bind(new.recurring_interval)
    .bind(new.tags)
    .bind(sqlx::types::Json(new.attachments))
    .fetch_one(db)
    .await
}

pub async fn delete(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryStatRow {
    pub category: Category,
    pub total_cents: Cents,
    pub count: i64,
}

pub async fn category_stats(
    db: &PgPool,
    owner: Uuid,
    start: Date,
    end: Date,
) -> sqlx::Result<Vec<CategoryStatRow>> {
    sqlx::query_as::<_, CategoryStatRow>(
        r#"
        SELECT category,
               CAST(SUM(amount_cents) AS BIGINT) AS total_cents,
               COUNT(*) AS count
        FROM expenses
        WHERE user_id = $1 AND date >= $2 AND date <= $3
        GROUP BY category
        ORDER BY total_cents DESC
        "#,
    )
    .bind(owner)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}

#[derive(Debug, Clone, FromRow)]
pub struct MonthlyStatRow {
    pub year: i32,
    pub month: i32,
    pub total_cents: Cents,
    pub count: i64,
}

pub async fn monthly_stats(
    db: &PgPool,
    owner: Uuid,
    start: Date,
    end: Date,
) -> sqlx::Result<Vec<MonthlyStatRow>> {
    sqlx::query_as::<_, MonthlyStatRow>(
        r#"
        SELECT CAST(EXTRACT(YEAR FROM date) AS INT) AS year,
               CAST(EXTRACT(MONTH FROM date) AS INT) AS month,
               CAST(SUM(amount_cents) AS BIGINT) AS total_cents,
               COUNT(*) AS count
        FROM expenses
        WHERE user_id = $1 AND date >= $2 AND date <= $3
        GROUP BY 1, 2
        ORDER BY 1, 2
        "#,
    )
    .bind(owner)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
}
