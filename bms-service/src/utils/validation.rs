use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that has passed its `validator` rules. Both malformed JSON and
/// failed validation are rejected with 400.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e.body_text()))
        })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Query string decoded into `T`; a bad value is a 400 in the usual error shape.
pub struct QueryParams<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid query: {}", e.body_text())))?;
        Ok(QueryParams(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Payload {
        #[validate(length(min = 1))]
        name: String,
    }

    async fn handler(ValidatedJson(p): ValidatedJson<Payload>) -> impl IntoResponse {
        p.name
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let app = Router::new().route("/", post(handler));
        let res = app.oneshot(request(r#"{"name":"Tower A"}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[derive(Deserialize)]
    struct Window {
        days: u32,
    }

    #[tokio::test]
    async fn query_params_reject_bad_values() {
        let app = Router::new().route(
            "/",
            axum::routing::get(|QueryParams(w): QueryParams<Window>| async move { w.days.to_string() }),
        );
        let ok = Request::builder().uri("/?days=30").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(ok).await.unwrap().status(), StatusCode::OK);

        let bad = Request::builder().uri("/?days=soon").body(Body::empty()).unwrap();
        assert_eq!(app.oneshot(bad).await.unwrap().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_malformed_and_invalid_bodies() {
        let app = Router::new().route("/", post(handler));
        let res = app.clone().oneshot(request("{not json")).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app.oneshot(request(r#"{"name":""}"#)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
