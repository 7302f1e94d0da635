use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::extractors::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::expenses::dto::{
    total_pages, BulkCreateRequest, BulkCreateResponse, DateRange, ExpenseData, ExpensePayload,
    ExpenseResponse, ListQuery, ListResponse, MessageResponse, PaginationMeta, StatsData,
    StatsQuery, StatsResponse,
};
use crate::expenses::repo::{self, ListFilter};
use crate::expenses::repo_types::Expense;
use crate::expenses::stats::resolve_range;
use crate::state::AppState;

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route("/expenses/stats", get(expense_stats))
        .route("/expenses/bulk", post(bulk_create_expenses))
        .route(
            "/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

/// Existence is checked before ownership so probing callers see NotFound
/// for missing rows and Forbidden only for rows that exist.
fn load_owned(expense: Option<Expense>, owner: Uuid, action: &str) -> Result<Expense, ApiError> {
    let expense = expense.ok_or_else(|| ApiError::NotFound("Expense not found".into()))?;
    if expense.user_id != owner {
        warn!(expense_id = %expense.id, owner = %expense.user_id, caller = %owner, "ownership check failed");
        return Err(ApiError::Forbidden(format!(
            "Not authorized to {action} this expense"
        )));
    }
    Ok(expense)
}

#[instrument(skip_all)]
async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    let filter = ListFilter {
        category: query.category_filter()?,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let (limit, page) = (query.limit(), query.page());

    let records = repo::list(&state.db, user.id, filter, limit, (page - 1) * limit).await?;
    let (total, total_amount) = repo::totals(&state.db, user.id, filter).await?;

    let data: Vec<ExpenseData> = records.into_iter().map(Into::into).collect();
    Ok(Json(ListResponse {
        success: true,
        count: data.len(),
        total,
        total_amount: total_amount.to_display(),
        pagination: PaginationMeta {
            page,
            limit,
            pages: total_pages(total, limit),
        },
        data,
    }))
}

#[instrument(skip_all)]
async fn get_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ExpenseResponse>> {
    let expense = load_owned(repo::find(&state.db, id).await?, user.id, "view")?;
    Ok(Json(ExpenseResponse {
        success: true,
        data: expense.into(),
    }))
}

#[instrument(skip_all)]
async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ExpensePayload>,
) -> ApiResult<(StatusCode, Json<ExpenseResponse>)> {
    let today = OffsetDateTime::now_utc().date();
    let new = payload.into_new_expense(today)?;

    let expense = repo::insert(&state.db, user.id, new).await?;
    info!(user_id = %user.id, expense_id = %expense.id, "expense created");

    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponse {
            success: true,
            data: expense.into(),
        }),
    ))
}

#[instrument(skip_all)]
async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExpensePayload>,
) -> ApiResult<Json<ExpenseResponse>> {
    let existing = load_owned(repo::find(&state.db, id).await?, user.id, "update")?;

    // merge fills the date, so the fallback day is never used here
    let merged = payload.merged_with(&existing).into_new_expense(existing.date)?;
    let expense = repo::update(&state.db, id, merged).await?;
    info!(user_id = %user.id, expense_id = %expense.id, "expense updated");

    Ok(Json(ExpenseResponse {
        success: true,
        data: expense.into(),
    }))
}

#[instrument(skip_all)]
async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let expense = load_owned(repo::find(&state.db, id).await?, user.id, "delete")?;

    repo::delete(&state.db, expense.id).await?;
    info!(user_id = %user.id, expense_id = %expense.id, "expense deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Expense deleted successfully".into(),
    }))
}

/// Inserts entries one by one: an invalid or failed entry is skipped and
/// never rolls back the ones that already landed.
#[instrument(skip_all)]
async fn bulk_create_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<BulkCreateRequest>,
) -> ApiResult<(StatusCode, Json<BulkCreateResponse>)> {
    if payload.expenses.is_empty() {
        return Err(ApiError::BadRequest(
            "Please provide an array of expenses".into(),
        ));
    }

    let today = OffsetDateTime::now_utc().date();
    let mut created = Vec::new();
    for (index, entry) in payload.expenses.into_iter().enumerate() {
        let new = match entry.into_new_expense(today) {
            Ok(n) => n,
            Err(e) => {
                warn!(index, error = %e, "skipping invalid bulk entry");
                continue;
            }
        };
        match repo::insert(&state.db, user.id, new).await {
            Ok(expense) => created.push(ExpenseData::from(expense)),
            Err(e) => warn!(index, error = %e, "bulk insert failed"),
        }
    }

    info!(user_id = %user.id, count = created.len(), "bulk created expenses");
    Ok((
        StatusCode::CREATED,
        Json(BulkCreateResponse {
            success: true,
            count: created.len(),
            data: created,
        }),
    ))
}

#[instrument(skip_all)]
async fn expense_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let today = OffsetDateTime::now_utc().date();
    let range = resolve_range(query.year, query.month, today)?;

    let category_rows = repo::category_stats(&state.db, user.id, range.start, range.end).await?;
    let monthly_rows = repo::monthly_stats(&state.db, user.id, range.start, range.end).await?;

    Ok(Json(StatsResponse {
        success: true,
        data: StatsData {
            category_stats: category_rows.into_iter().map(Into::into).collect(),
            monthly_stats: monthly_rows.into_iter().map(Into::into).collect(),
            date_range: DateRange {
                start: range.start,
                end: range.end,
            },
        },
    }))
}
