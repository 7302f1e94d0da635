use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::{ApiError, FieldError};
use crate::expenses::repo_types::{Attachment, Category, Expense, NewExpense, RecurringInterval};
use crate::money::Cents;

/// `YYYY-MM-DD` wire format for day-precision dates.
pub(crate) mod day_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{format_description::FormatItem, macros::format_description, Date};

    const FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, FORMAT).map_err(serde::de::Error::custom)
    }

    /// Deserialize-only variant for optional query/body fields.
    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Date>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|s| Date::parse(&s, FORMAT).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

/// Incoming expense fields. All optional so the same shape serves create
/// (which requires title/amount/category) and partial update (which merges
/// onto the stored row first).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePayload {
    pub title: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "day_format::option")]
    pub date: Option<Date>,
    pub is_recurring: Option<bool>,
    pub recurring_interval: Option<String>,
    pub tags: Option<Vec<String>>,
    pub attachments: Option<Vec<Attachment>>,
}

pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

impl ExpensePayload {
    /// Validates every field constraint at once; the error lists all
    /// violations, not just the first.
    pub fn into_new_expense(self, today: Date) -> Result<NewExpense, ApiError> {
        let mut errors = Vec::new();

        let title = match self.title.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("title", "Please provide expense title"));
                None
            }
            Some(t) if t.chars().count() > 100 => {
                errors.push(FieldError::new(
                    "title",
                    "Title cannot exceed 100 characters",
                ));
                None
            }
            Some(t) => Some(t.to_string()),
        };

        let amount_cents = match self.amount {
            None => {
                errors.push(FieldError::new("amount", "Please provide expense amount"));
                None
            }
            Some(a) if !a.is_finite() => {
                errors.push(FieldError::new("amount", "Amount must be a number"));
                None
            }
            Some(a) if a < 0.0 => {
                errors.push(FieldError::new("amount", "Amount cannot be negative"));
                None
            }
            Some(a) => Some(Cents::from_display(a)),
        };

        let category = match self.category.as_deref() {
            None => {
                errors.push(FieldError::new(
                    "category",
                    "Please provide expense category",
                ));
                None
            }
            Some(raw) => match raw.parse::<Category>() {
                Ok(c) => Some(c),
                Err(()) => {
                    errors.push(FieldError::new(
                        "category",
                        format!("{raw} is not a valid category"),
                    ));
                    None
                }
            },
        };

        let description = self.description.unwrap_or_default();
        if description.chars().count() > 500 {
            errors.push(FieldError::new(
                "description",
                "Description cannot exceed 500 characters",
            ));
        }

        let is_recurring = self.is_recurring.unwrap_or(false);
        let recurring_interval = match (is_recurring, self.recurring_interval.as_deref()) {
            (false, None) => None,
            (true, None) => {
                errors.push(FieldError::new(
                    "recurringInterval",
                    "Please provide a recurring interval",
                ));
                None
            }
            (false, Some(_)) => {
                errors.push(FieldError::new(
                    "recurringInterval",
                    "recurringInterval is only valid for recurring expenses",
                ));
                None
            }
            (true, Some(raw)) => match raw.parse::<RecurringInterval>() {
                Ok(i) => Some(i),
                Err(()) => {
                    errors.push(FieldError::new(
                        "recurringInterval",
                        format!("{raw} is not a valid recurring interval"),
                    ));
                    None
                }
            },
        };

        match (title, amount_cents, category) {
            (Some(title), Some(amount_cents), Some(category)) if errors.is_empty() => {
                Ok(NewExpense {
                    title,
                    amount_cents,
                    category,
                    description,
                    date: self.date.unwrap_or(today),
                    is_recurring,
                    recurring_interval,
                    tags: normalize_tags(self.tags.unwrap_or_default()),
                    attachments: self.attachments.unwrap_or_default(),
                })
            }
            _ => Err(ApiError::Validation(errors)),
        }
    }

    /// Overlays this partial payload on a stored row so the merged result
    /// can be re-validated with the create rules.
    pub fn merged_with(self, existing: &Expense) -> ExpensePayload {
        // Turning recurrence off without a replacement interval clears the
        // stored one; interval-iff-recurring must survive the merge.
        let clears_recurrence =
            self.is_recurring == Some(false) && self.recurring_interval.is_none();

        ExpensePayload {
            title: self.title.or_else(|| Some(existing.title.clone())),
            amount: self
                .amount
                .or_else(|| Some(existing.amount_cents.to_display())),
            category: self.category.or_else(|| Some(existing.category.to_string())),
            description: self
                .description
                .or_else(|| Some(existing.description.clone())),
            date: self.date.or(Some(existing.date)),
            is_recurring: self.is_recurring.or(Some(existing.is_recurring)),
            recurring_interval: if clears_recurrence {
                None
            } else {
                self.recurring_interval.or_else(|| {
                    existing
                        .recurring_interval
                        .map(|i| i.as_str().to_string())
                })
            },
            tags: self.tags.or_else(|| Some(existing.tags.clone())),
            attachments: self
                .attachments
                .or_else(|| Some(existing.attachments.0.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    #[serde(default, with = "day_format::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "day_format::option")]
    pub end_date: Option<Date>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_limit() -> i64 {
    50
}

fn default_page() -> i64 {
    1
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.max(1)
    }

    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    /// Parses the category filter; an unknown value is a validation
    /// failure, never an empty result set.
    pub fn category_filter(&self) -> Result<Option<Category>, ApiError> {
        match self.category.as_deref() {
            None => Ok(None),
            Some(raw) => raw.parse::<Category>().map(Some).map_err(|()| {
                ApiError::Validation(vec![FieldError::new(
                    "category",
                    format!("{raw} is not a valid category"),
                )])
            }),
        }
    }
}

pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub year: Option<i32>,
    pub month: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseData {
    pub id: Uuid,
    pub user: Uuid,
    pub title: String,
    pub amount: f64,
    pub category: Category,
    pub description: String,
    #[serde(with = "day_format")]
    pub date: Date,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_interval: Option<RecurringInterval>,
    pub tags: Vec<String>,
    pub attachments: Vec<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Expense> for ExpenseData {
    fn from(e: Expense) -> Self {
        Self {
            id: e.id,
            user: e.user_id,
            title: e.title,
            amount: e.amount_cents.to_display(),
            category: e.category,
            description: e.description,
            date: e.date,
            is_recurring: e.is_recurring,
            recurring_interval: e.recurring_interval,
            tags: e.tags,
            attachments: e.attachments.0,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub total_amount: f64,
    pub pagination: PaginationMeta,
    pub data: Vec<ExpenseData>,
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub success: bool,
    pub data: ExpenseData,
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub expenses: Vec<ExpensePayload>,
}

#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ExpenseData>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: Category,
    pub total_amount: f64,
    pub count: i64,
    pub average_amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStat {
    pub year: i32,
    pub month: i32,
    pub total_amount: f64,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    #[serde(with = "day_format")]
    pub start: Date,
    #[serde(with = "day_format")]
    pub end: Date,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub category_stats: Vec<CategoryStat>,
    pub monthly_stats: Vec<MonthlyStat>,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub data: StatsData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn full_payload() -> ExpensePayload {
        ExpensePayload {
            title: Some("Coffee".into()),
            amount: Some(4.5),
            category: Some("Food".into()),
            description: Some("flat white".into()),
            date: Some(date!(2024 - 03 - 01)),
            ..Default::default()
        }
    }

    fn stored_expense() -> Expense {
        let now = OffsetDateTime::now_utc();
        Expense {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Rent".into(),
            amount_cents: Cents(120_000),
            category: Category::Housing,
            description: String::new(),
            date: date!(2024 - 01 - 01),
            is_recurring: true,
            recurring_interval: Some(RecurringInterval::Monthly),
            tags: vec!["home".into()],
            attachments: sqlx::types::Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn valid_payload_converts_to_cents() {
        let new = full_payload()
            .into_new_expense(date!(2024 - 06 - 15))
            .expect("valid");
        assert_eq!(new.title, "Coffee");
        assert_eq!(new.amount_cents, Cents(450));
        assert_eq!(new.category, Category::Food);
        assert_eq!(new.date, date!(2024 - 03 - 01));
        assert!(!new.is_recurring);
    }

    #[test]
    fn empty_payload_reports_all_required_fields() {
        let err = ExpensePayload::default()
            .into_new_expense(date!(2024 - 06 - 15))
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert_eq!(fields, vec!["title", "amount", "category"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn negative_amount_is_rejected() {
        let payload = ExpensePayload {
            amount: Some(-0.01),
            ..full_payload()
        };
        let err = payload.into_new_expense(date!(2024 - 06 - 15)).unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.field == "amount"));
    }

    #[test]
    fn unknown_category_names_the_value() {
        let payload = ExpensePayload {
            category: Some("Groceries".into()),
            ..full_payload()
        };
        let ApiError::Validation(errors) =
            payload.into_new_expense(date!(2024 - 06 - 15)).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "category");
        assert!(errors[0].message.contains("Groceries"));
    }

    #[test]
    fn overlong_title_and_description_are_both_reported() {
        let payload = ExpensePayload {
            title: Some("x".repeat(101)),
            description: Some("y".repeat(501)),
            ..full_payload()
        };
        let ApiError::Validation(errors) =
            payload.into_new_expense(date!(2024 - 06 - 15)).unwrap_err()
        else {
            panic!("expected validation error");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["title", "description"]);
    }

    #[test]
    fn recurring_requires_interval_and_vice_versa() {
        let missing = ExpensePayload {
            is_recurring: Some(true),
            ..full_payload()
        };
        let ApiError::Validation(errors) =
            missing.into_new_expense(date!(2024 - 06 - 15)).unwrap_err()
        else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].field, "recurringInterval");

        let stray = ExpensePayload {
            recurring_interval: Some("monthly".into()),
            ..full_payload()
        };
        assert!(stray.into_new_expense(date!(2024 - 06 - 15)).is_err());
    }

    #[test]
    fn date_defaults_to_today() {
        let payload = ExpensePayload {
            date: None,
            ..full_payload()
        };
        let new = payload
            .into_new_expense(date!(2024 - 06 - 15))
            .expect("valid");
        assert_eq!(new.date, date!(2024 - 06 - 15));
    }

    #[test]
    fn tags_are_trimmed_lowercased_and_deduped_in_order() {
        assert_eq!(
            normalize_tags(vec![
                " Coffee ".into(),
                "work".into(),
                "COFFEE".into(),
                "  ".into(),
                "Work".into(),
            ]),
            vec!["coffee".to_string(), "work".to_string()]
        );
    }

    #[test]
    fn merge_keeps_stored_fields_for_absent_ones() {
        let existing = stored_expense();
        let merged = ExpensePayload {
            amount: Some(1300.0),
            ..Default::default()
        }
        .merged_with(&existing);
        let new = merged
            .into_new_expense(date!(2024 - 06 - 15))
            .expect("valid");
        assert_eq!(new.title, "Rent");
        assert_eq!(new.amount_cents, Cents(130_000));
        assert_eq!(new.category, Category::Housing);
        assert!(new.is_recurring);
        assert_eq!(new.recurring_interval, Some(RecurringInterval::Monthly));
    }

    #[test]
    fn merge_clearing_recurrence_drops_stored_interval() {
        let existing = stored_expense();
        let merged = ExpensePayload {
            is_recurring: Some(false),
            ..Default::default()
        }
        .merged_with(&existing);
        let new = merged
            .into_new_expense(date!(2024 - 06 - 15))
            .expect("valid");
        assert!(!new.is_recurring);
        assert_eq!(new.recurring_interval, None);
    }

    #[test]
    fn total_pages_matches_ceiling_division() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(1, 50), 1);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(101, 50), 3);
    }

    #[test]
    fn expense_data_serializes_camel_case_decimal_amount() {
        let data: ExpenseData = stored_expense().into();
        let v = serde_json::to_value(&data).unwrap();
        assert_eq!(v["amount"], 1200.0);
        assert_eq!(v["isRecurring"], true);
        assert_eq!(v["recurringInterval"], "monthly");
        assert_eq!(v["date"], "2024-01-01");
        assert!(v.get("amountCents").is_none());
    }

    #[test]
    fn list_query_parses_dates_and_defaults() {
        let q: ListQuery = serde_json::from_str(
            r#"{"category":"Food","startDate":"2024-01-01","endDate":"2024-12-31"}"#,
        )
        .unwrap();
        assert_eq!(q.category_filter().unwrap(), Some(Category::Food));
        assert_eq!(q.start_date, Some(date!(2024 - 01 - 01)));
        assert_eq!(q.end_date, Some(date!(2024 - 12 - 31)));
        assert_eq!(q.limit(), 50);
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn list_query_rejects_unknown_category_filter() {
        let q: ListQuery = serde_json::from_str(r#"{"category":"Fuel"}"#).unwrap();
        assert!(matches!(
            q.category_filter().unwrap_err(),
            ApiError::Validation(_)
        ));
    }
}
