use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use validator::Validate;

use crate::error::{AppError, FieldErrors};

/// JSON body that has been decoded and passed its `validator` rules.
///
/// Both decode failures (bad JSON, missing fields, wrong types) and rule
/// violations are turned into 400 envelopes before the handler runs.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                debug!(error = %rejection, "json body rejected");
                match rejection {
                    JsonRejection::JsonDataError(e) => {
                        AppError::Validation(data_error_fields(&e.body_text()))
                    }
                    JsonRejection::JsonSyntaxError(_) => {
                        AppError::BadRequest("Request body is not valid JSON".into())
                    }
                    other => AppError::BadRequest(other.body_text()),
                }
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Turns a serde data error (shape `"<path>: <reason> at line L column C"`,
/// or `"missing field `x` at ..."` at the root) into a field error map.
/// Parser positions are dropped.
fn data_error_fields(text: &str) -> FieldErrors {
    let text = text
        .split_once("target type: ")
        .map_or(text, |(_, rest)| rest);
    let text = text.rfind(" at line ").map_or(text, |i| &text[..i]);

    let (field, message) = if let Some(name) = text
        .strip_prefix("missing field `")
        .and_then(|rest| rest.strip_suffix('`'))
    {
        (name.to_string(), format!("{} is required", name))
    } else {
        match text.split_once(": ") {
            Some((path, reason)) if !path.is_empty() && !path.contains(' ') => {
                (path.to_string(), reason.to_string())
            }
            _ => ("body".to_string(), text.to_string()),
        }
    };

    let mut errors = FieldErrors::new();
    errors.insert(field, vec![message]);
    errors
}
