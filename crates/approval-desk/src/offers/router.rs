use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::book::OfferError;
use super::domain::{BusinessId, OfferFields, OfferId};
use super::repository::{BusinessRepository, RepositoryError};
use super::service::{BusinessDraft, OfferDeskService, OfferServiceError};

type SharedService<R> = Arc<OfferDeskService<R>>;

/// Router builder exposing offer maintenance, bulk import, and the public letter view.
pub fn offer_router<R>(service: SharedService<R>) -> Router
where
    R: BusinessRepository + 'static,
{
    Router::new()
        .route("/api/v1/businesses", post(create_business_handler::<R>))
        .route(
            "/api/v1/businesses/:business_id",
            axum::routing::delete(delete_business_handler::<R>),
        )
        .route(
            "/api/v1/businesses/:business_id/offers",
            get(list_offers_handler::<R>).post(add_offer_handler::<R>),
        )
        .route(
            "/api/v1/businesses/:business_id/offers/:offer_id",
            axum::routing::put(edit_offer_handler::<R>).delete(delete_offer_handler::<R>),
        )
        .route(
            "/api/v1/businesses/:business_id/offers/:offer_id/primary",
            post(set_primary_handler::<R>),
        )
        .route("/api/v1/imports", post(import_handler::<R>))
        .route(
            "/api/v1/approval-letters/:business_id",
            get(approval_letter_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LetterQuery {
    #[serde(default)]
    pub(crate) index: usize,
}

pub(crate) async fn create_business_handler<R>(
    State(service): State<SharedService<R>>,
    Json(draft): Json<BusinessDraft>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.create_business(draft) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_business_handler<R>(
    State(service): State<SharedService<R>>,
    Path(business_id): Path<String>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.delete_business(&BusinessId(business_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn list_offers_handler<R>(
    State(service): State<SharedService<R>>,
    Path(business_id): Path<String>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.offers(&BusinessId(business_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn add_offer_handler<R>(
    State(service): State<SharedService<R>>,
    Path(business_id): Path<String>,
    Json(fields): Json<OfferFields>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.add_offer(&BusinessId(business_id), fields) {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn edit_offer_handler<R>(
    State(service): State<SharedService<R>>,
    Path((business_id, offer_id)): Path<(String, String)>,
    Json(fields): Json<OfferFields>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.edit_offer(&BusinessId(business_id), &OfferId(offer_id), fields) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn set_primary_handler<R>(
    State(service): State<SharedService<R>>,
    Path((business_id, offer_id)): Path<(String, String)>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.set_primary(&BusinessId(business_id), &OfferId(offer_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_offer_handler<R>(
    State(service): State<SharedService<R>>,
    Path((business_id, offer_id)): Path<(String, String)>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.delete_offer(&BusinessId(business_id), &OfferId(offer_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<R>(
    State(service): State<SharedService<R>>,
    body: String,
) -> Response
where
    R: BusinessRepository + 'static,
{
    match service.import_csv(Cursor::new(body.into_bytes())) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approval_letter_handler<R>(
    State(service): State<SharedService<R>>,
    Path(business_id): Path<String>,
    Query(query): Query<LetterQuery>,
) -> Response
where
    R: BusinessRepository + 'static,
{
    let business_id = BusinessId(business_id);
    match service.approval_letter(&business_id, query.index) {
        Ok(Some(letter)) => (StatusCode::OK, Json(letter)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "no offers available",
                "business_id": business_id.0,
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: OfferServiceError) -> Response {
    let status = match &error {
        OfferServiceError::BusinessNotFound(_)
        | OfferServiceError::Offer(OfferError::NotFound { .. })
        | OfferServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        OfferServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        OfferServiceError::MissingBusinessName => StatusCode::UNPROCESSABLE_ENTITY,
        OfferServiceError::Import(_) => StatusCode::BAD_REQUEST,
        OfferServiceError::Repository(
            RepositoryError::Corrupt(_) | RepositoryError::Unavailable(_),
        ) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}
