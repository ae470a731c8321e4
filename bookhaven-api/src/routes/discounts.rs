/// Discount endpoints
///
/// # Endpoints
///
/// - `GET /v1/discounts/sale` - Books on sale now, with discounted prices (public)
/// - `GET /v1/books/:id/sale` - Current sale price of one book (public)
/// - `GET /v1/discounts` - All discounts
/// - `GET /v1/discounts/:id`
/// - `POST /v1/discounts` - Create (admin)
/// - `PUT /v1/discounts/:id` - Replace every field (admin)
/// - `DELETE /v1/discounts/:id` - (admin)
///
/// Expired discounts are switched off by the worker's sweeper.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bookhaven_shared::{
    auth::{authorization::require_admin, middleware::AuthContext},
    models::{
        book::Book,
        discount::{Discount, DiscountInput, SaleBook},
    },
    validation::{date_window, percentage},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "discount_window"))]
pub struct DiscountRequest {
    pub book_id: Uuid,
    #[validate(custom(function = "percentage"))]
    pub discount_percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub on_sale: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn discount_window(req: &DiscountRequest) -> Result<(), ValidationError> {
    date_window(req.start_date, req.end_date)
}

impl DiscountRequest {
    fn into_input(self) -> DiscountInput {
        DiscountInput {
            book_id: self.book_id,
            discount_percentage: self.discount_percentage,
            start_date: self.start_date,
            end_date: self.end_date,
            on_sale: self.on_sale,
            is_active: self.is_active,
        }
    }
}

fn discount_not_found() -> ApiError {
    ApiError::NotFound("Discount not found".to_string())
}

async fn checked_input(state: &AppState, req: DiscountRequest) -> ApiResult<DiscountInput> {
    req.validate()?;
    if !Book::exists(&state.db, req.book_id).await? {
        return Err(ApiError::NotFound("Book not found".to_string()));
    }
    Ok(req.into_input())
}

pub async fn list_sale_books(State(state): State<AppState>) -> ApiResult<Json<Vec<SaleBook>>> {
    Ok(Json(Discount::current_sales(&state.db).await?))
}

pub async fn get_book_sale(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<SaleBook>> {
    let sale = Discount::current_sale_for_book(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("No active sale for this book".to_string()))?;

    Ok(Json(sale))
}

/// # Errors
///
/// - `404 Not Found`: there are no discounts at all
pub async fn list_discounts(State(state): State<AppState>, _auth: AuthContext) -> ApiResult<Json<Vec<Discount>>> {
    let discounts = Discount::list(&state.db).await?;
    if discounts.is_empty() {
        return Err(ApiError::NotFound("No discounts found".to_string()));
    }

    Ok(Json(discounts))
}

pub async fn get_discount(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Discount>> {
    let discount = Discount::find_by_id(&state.db, id)
        .await?
        .ok_or_else(discount_not_found)?;

    Ok(Json(discount))
}

pub async fn create_discount(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<DiscountRequest>,
) -> ApiResult<(StatusCode, Json<Discount>)> {
    require_admin(&auth)?;
    let input = checked_input(&state, req).await?;

    let discount = Discount::create(&state.db, auth.user_id, input).await?;
    tracing::info!(
        discount_id = %discount.id,
        book_id = %discount.book_id,
        percentage = %discount.discount_percentage,
        "Discount created"
    );

    Ok((StatusCode::CREATED, Json(discount)))
}

pub async fn update_discount(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(req): Json<DiscountRequest>,
) -> ApiResult<Json<Discount>> {
    require_admin(&auth)?;
    let input = checked_input(&state, req).await?;

    let discount = Discount::replace(&state.db, id, input)
        .await?
        .ok_or_else(discount_not_found)?;

    Ok(Json(discount))
}

pub async fn delete_discount(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_admin(&auth)?;

    if !Discount::delete(&state.db, id).await? {
        return Err(discount_not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn request(percentage: Decimal) -> DiscountRequest {
        let start = Utc::now();
        DiscountRequest {
            book_id: Uuid::new_v4(),
            discount_percentage: percentage,
            start_date: start,
            end_date: start + Duration::days(7),
            on_sale: true,
            is_active: true,
        }
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(request(Decimal::new(25, 0)).validate().is_ok());
        assert!(request(Decimal::ONE_HUNDRED).validate().is_ok());
        assert!(request(Decimal::ZERO).validate().is_err());
        assert!(request(Decimal::new(10001, 2)).validate().is_err());
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut req = request(Decimal::new(10, 0));
        req.end_date = req.start_date - Duration::hours(1);

        match ApiError::from(req.validate().unwrap_err()) {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "end_date");
                assert_eq!(details[0].message, "End date must be after start date");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_flags_default_to_true() {
        let req: DiscountRequest = serde_json::from_value(serde_json::json!({
            "book_id": Uuid::new_v4(),
            "discount_percentage": "15",
            "start_date": "2025-05-01T00:00:00Z",
            "end_date": "2025-05-31T00:00:00Z"
        }))
        .unwrap();

        assert!(req.on_sale);
        assert!(req.is_active);
        assert_eq!(req.discount_percentage, Decimal::new(15, 0));
    }
}
