use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::{macros::format_description, Date};
use water_client::domain::{Reading, ReadingId, Tariff, User};

use super::{AppError, AppState, CurrentUser};
use crate::{
    accounts,
    analyzer::CostAnalysis,
    dashboard::{self as dash, DashboardSummary},
};

#[derive(Debug, Deserialize)]
pub struct AddReadingRequest {
    /// ISO 8601 calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct TariffRequest {
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

fn parse_date(raw: &str) -> Result<Date, AppError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw.trim(), format)
        .map_err(|e| AppError::MalformedPayload(format!("invalid date '{raw}': {e}")))
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(dash::dashboard(state.store.as_ref(), owner).await?))
}

pub async fn list_readings(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
) -> Result<Json<Vec<Reading>>, AppError> {
    Ok(Json(dash::history(state.store.as_ref(), owner).await?))
}

pub async fn add_reading(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
    Json(payload): Json<AddReadingRequest>,
) -> Result<(StatusCode, Json<Reading>), AppError> {
    let date = parse_date(&payload.date)?;
    let reading = state
        .engine
        .add(state.store.as_ref(), owner, date, payload.value)
        .await?;
    Ok((StatusCode::CREATED, Json(dash::rounded(reading))))
}

pub async fn delete_reading(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<ReadingId>,
) -> Result<StatusCode, AppError> {
    state.engine.delete(state.store.as_ref(), id, owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cost_analysis(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
) -> Result<Json<CostAnalysis>, AppError> {
    Ok(Json(state.analyzer.analyze(state.store.as_ref(), owner).await?))
}

pub async fn update_tariff(
    State(state): State<Arc<AppState>>,
    CurrentUser(_owner): CurrentUser,
    Json(payload): Json<TariffRequest>,
) -> Result<(StatusCode, Json<Tariff>), AppError> {
    let tariff = state
        .analyzer
        .set_tariff(state.store.as_ref(), payload.cost)
        .await?;
    Ok((StatusCode::CREATED, Json(tariff)))
}

pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = accounts::register(
        state.store.as_ref(),
        &payload.username,
        &payload.email,
        &payload.password_hash,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn delete_current_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
) -> Result<StatusCode, AppError> {
    accounts::remove_user(state.store.as_ref(), owner).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SpikeConfig, http::router, http::USER_ID_HEADER};
    use axum::{
        body::{to_bytes, Body},
        http::Request,
        Router,
    };
    use serde_json::Value;
    use time::OffsetDateTime;
    use tower::ServiceExt;
    use water_client::MemoryStore;

    fn app() -> Router {
        router(AppState::new(
            Arc::new(MemoryStore::new()),
            SpikeConfig::default(),
        ))
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_user_header_is_unauthorized() {
        let res = app()
            .oneshot(request("GET", "/dashboard", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn add_then_dashboard() {
        let app = app();

        let res = app
            .clone()
            .oneshot(request(
                "POST",
                "/readings",
                Some("1"),
                Some(r#"{"date":"2024-01-01","value":100}"#),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .clone()
            .oneshot(request(
                "POST",
                "/readings",
                Some("1"),
                Some(r#"{"date":"2024-01-08","value":130}"#),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json(res).await;
        assert_eq!(body["consumption"], 30.0);
        assert_eq!(body["is_spike"], false);
        assert_eq!(body["date"], "2024-01-08");

        let res = app
            .oneshot(request("GET", "/dashboard", Some("1"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body["total_consumption"], 30.0);
        assert_eq!(body["recent_readings"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn engine_rejections_carry_their_message() {
        let app = app();
        app.clone()
            .oneshot(request(
                "POST",
                "/readings",
                Some("1"),
                Some(r#"{"date":"2024-01-01","value":100}"#),
            ))
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(request(
                "POST",
                "/readings",
                Some("1"),
                Some(r#"{"date":"2024-01-01","value":110}"#),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let tomorrow = OffsetDateTime::now_utc().date().next_day().unwrap();
        let body = format!(r#"{{"date":"{tomorrow}","value":200}}"#);
        let res = app
            .oneshot(request("POST", "/readings", Some("1"), Some(&body)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json(res).await;
        assert!(body["error"].as_str().unwrap().contains("future"));
    }

    #[tokio::test]
    async fn reading_responses_carry_rounded_consumption() {
        let app = app();
        for (date, value) in [("2024-01-01", "100.0"), ("2024-01-08", "130.1")] {
            let res = app
                .clone()
                .oneshot(request(
                    "POST",
                    "/readings",
                    Some("1"),
                    Some(&format!(r#"{{"date":"{date}","value":{value}}}"#)),
                ))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
            if date == "2024-01-08" {
                assert_eq!(json(res).await["consumption"], 30.1);
            }
        }

        let res = app
            .oneshot(request("GET", "/readings", Some("1"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body[0]["consumption"], 30.1);
        assert_eq!(body[0]["value"], 130.1);
    }

    #[tokio::test]
    async fn malformed_date_is_bad_request() {
        let res = app()
            .oneshot(request(
                "POST",
                "/readings",
                Some("1"),
                Some(r#"{"date":"01/08/2024","value":1}"#),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_unknown_reading_is_no_content() {
        let res = app()
            .oneshot(request("DELETE", "/readings/42", Some("1"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn tariff_update_and_cost_view() {
        let app = app();

        let res = app
            .clone()
            .oneshot(request("POST", "/tariff", Some("1"), Some(r#"{"cost":-1}"#)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let res = app
            .clone()
            .oneshot(request("POST", "/tariff", Some("1"), Some(r#"{"cost":2.5}"#)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = app
            .oneshot(request("GET", "/cost", Some("1"), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = json(res).await;
        assert_eq!(body["current_tariff"], 2.5);
        assert_eq!(body["total_monthly_cost"], 0.0);
    }

    #[tokio::test]
    async fn register_hides_password_hash() {
        let res = app()
            .oneshot(request(
                "POST",
                "/users",
                None,
                Some(r#"{"username":"ana","email":"ana@example.com","password_hash":"$h"}"#),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = json(res).await;
        assert_eq!(body["username"], "ana");
        assert!(body.get("password_hash").is_none());
    }
}
