//! Booking handlers. Every route requires a bearer token.
use crate::api::error::{ApiError, api_validation_error};
use crate::api::extract::{ApiJson, Caller};
use crate::api::types::BookingStatusRequest;
use crate::app::AppState;
use crate::model::{Booking, BookingStatus, NewBooking};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "bookings",
    request_body = NewBooking,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Booking created", body = Booking),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_booking(
    Caller(identity): Caller,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewBooking>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state.bookings.create_booking(Some(&identity), body).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "bookings",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's bookings, or all bookings for an admin", body = [Booking]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_bookings(
    Caller(identity): Caller,
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, ApiError> {
    Ok(Json(state.bookings.list_bookings(Some(&identity)).await?))
}

#[utoipa::path(
    get,
    path = "/bookings/{booking_id}",
    tag = "bookings",
    params(("booking_id" = String, Path, description = "Booking identifier")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Booking", body = Booking),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Not found or not visible to the caller")
    )
)]
pub async fn get_booking(
    Caller(identity): Caller,
    Path(booking_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(
        state
            .bookings
            .get_booking(Some(&identity), &booking_id)
            .await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/bookings/{booking_id}",
    tag = "bookings",
    params(("booking_id" = String, Path, description = "Booking identifier")),
    request_body = BookingStatusRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Updated booking", body = Booking),
        (status = 400, description = "Missing or unknown status"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Booking not found"),
        (status = 409, description = "Transition not allowed")
    )
)]
pub async fn update_booking_status(
    Caller(identity): Caller,
    Path(booking_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(body): ApiJson<BookingStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    let status: BookingStatus = body
        .status
        .as_deref()
        .ok_or_else(|| api_validation_error("status is required"))?
        .parse()
        .map_err(|err: String| api_validation_error(&err))?;
    let booking = state
        .bookings
        .set_booking_status(Some(&identity), &booking_id, status)
        .await?;
    Ok(Json(booking))
}
