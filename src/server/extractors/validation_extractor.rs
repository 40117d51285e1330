use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::server::error::Error;

/// query string extractor that runs the `validator` rules before the handler sees it
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                debug!("rejected query string: {}", rejection.body_text());
                Error::BadRequest(rejection.body_text())
            })?;

        value.validate().map_err(|errors| {
            debug!("query failed validation: {}", errors);
            Error::BadRequest(errors.to_string())
        })?;

        Ok(ValidatedQuery(value))
    }
}
