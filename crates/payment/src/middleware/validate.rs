use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{StatusCode, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use validator::{Validate, ValidationErrors};

type Rejection = (StatusCode, Json<Value>);

/// JSON body that has passed `validator` checks.
pub struct SimpleValidatedJson<T>(pub T);

/// Query string that has passed `validator` checks.
pub struct SimpleValidatedQuery<T>(pub T);

impl<S, T> FromRequest<S> for SimpleValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                (
                    rejection.status(),
                    Json(json!({
                        "status": "error",
                        "message": format!("Invalid JSON: {}", rejection.body_text()),
                    })),
                )
            })?;

        value.validate().map_err(validation_rejection)?;
        Ok(Self(value))
    }
}

impl<S, T> FromRequestParts<S> for SimpleValidatedQuery<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                (
                    rejection.status(),
                    Json(json!({
                        "status": "error",
                        "message": format!("Invalid query: {}", rejection.body_text()),
                    })),
                )
            })?;

        value.validate().map_err(validation_rejection)?;
        Ok(Self(value))
    }
}

fn validation_rejection(errors: ValidationErrors) -> Rejection {
    let fields = field_messages(&errors);

    let summary: Vec<String> = fields
        .iter()
        .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
        .collect();

    let details: serde_json::Map<String, Value> = fields
        .into_iter()
        .map(|(field, messages)| (field, json!(messages)))
        .collect();

    let message = if summary.is_empty() {
        "Validation failed".to_string()
    } else {
        format!("Validation failed: {}", summary.join("; "))
    };

    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": "error",
            "message": message,
            "details": details,
        })),
    )
}

fn field_messages(errors: &ValidationErrors) -> Vec<(String, Vec<String>)> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, field_errors)| {
            let messages = field_errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| match e.code.as_ref() {
                            "length" => "Invalid length".to_string(),
                            "range" => "Value out of range".to_string(),
                            _ => format!("Invalid {field}"),
                        })
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}
