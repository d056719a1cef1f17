use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};

use super::errors::AppError;
use crate::error::ServiceError;

/// `Json<T>` whose rejections (bad syntax, wrong field types, missing
/// fields, wrong content type) become `400` with the usual error body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ServiceError::InvalidBody(rejection.body_text()).into()),
        }
    }
}
