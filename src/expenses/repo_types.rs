use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::money::Cents;

/// Fixed expense categories. Stored as the Postgres enum
/// `expense_category`; unknown values are a validation failure upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "expense_category")]
pub enum Category {
    Food,
    Transportation,
    Housing,
    Entertainment,
    Healthcare,
    Shopping,
    Education,
    Utilities,
    Insurance,
    Savings,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Food,
        Category::Transportation,
        Category::Housing,
        Category::Entertainment,
        Category::Healthcare,
        Category::Shopping,
        Category::Education,
        Category::Utilities,
        Category::Insurance,
        Category::Savings,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transportation => "Transportation",
            Category::Housing => "Housing",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Shopping => "Shopping",
            Category::Education => "Education",
            Category::Utilities => "Utilities",
            Category::Insurance => "Insurance",
            Category::Savings => "Savings",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "recurring_interval", rename_all = "lowercase")]
pub enum RecurringInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurringInterval::Daily => "daily",
            RecurringInterval::Weekly => "weekly",
            RecurringInterval::Monthly => "monthly",
            RecurringInterval::Yearly => "yearly",
        }
    }
}

impl std::str::FromStr for RecurringInterval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RecurringInterval::Daily),
            "weekly" => Ok(RecurringInterval::Weekly),
            "monthly" => Ok(RecurringInterval::Monthly),
            "yearly" => Ok(RecurringInterval::Yearly),
            _ => Err(()),
        }
    }
}

/// File reference attached to an expense, kept as JSONB.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    #[serde(
        default = "OffsetDateTime::now_utc",
        with = "time::serde::rfc3339"
    )]
    pub uploaded_at: OffsetDateTime,
}

/// Stored expense row. `amount_cents` is the canonical representation;
/// the decimal form exists only in DTOs.
#[derive(Debug, Clone, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub amount_cents: Cents,
    pub category: Category,
    pub description: String,
    pub date: Date,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
    pub tags: Vec<String>,
    pub attachments: sqlx::types::Json<Vec<Attachment>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated insert payload; the owner id is supplied by the caller
/// identity at the repository boundary, never by the request.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub title: String,
    pub amount_cents: Cents,
    pub category: Category,
    pub description: String,
    pub date: Date,
    pub is_recurring: bool,
    pub recurring_interval: Option<RecurringInterval>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
}
