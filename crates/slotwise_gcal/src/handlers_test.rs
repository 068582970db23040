#[cfg(test)]
mod tests {
    use crate::auth::AuthManager;
    use crate::handlers::{resolve_time_zone, GcalState};
    use crate::routes::routes;
    use crate::service::GoogleCalendarClient;
    use crate::test_support::{fresh_tokens, MemoryTokenStore, StaticTokenSource};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use slotwise_booking::WorkingHoursPolicy;
    use slotwise_config::{
        AppConfig, BookingConfig, DayHoursConfig, GcalConfig, ServerConfig,
    };
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_config() -> AppConfig {
        let mut work_hours = HashMap::new();
        for day in [
            "monday",
            "tuesday",
            "wednesday",
            "thursday",
            "friday",
            "saturday",
            "sunday",
        ] {
            work_hours.insert(
                day.to_string(),
                DayHoursConfig {
                    start: "09:00".to_string(),
                    end: "17:00".to_string(),
                },
            );
        }
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            use_gcal: true,
            booking: BookingConfig {
                work_hours,
                ..BookingConfig::default()
            },
            gcal: GcalConfig {
                calendar_id: Some("primary".to_string()),
                time_zone: Some("UTC".to_string()),
                redirect_uri: Some("http://localhost:8080/auth/callback".to_string()),
                request_timeout_secs: Some(5),
                ..GcalConfig::default()
            },
        }
    }

    async fn app_against(server: &MockServer, authorized: bool) -> axum::Router {
        let config = Arc::new(app_config());
        let policy = Arc::new(WorkingHoursPolicy::from_config(&config.booking).unwrap());

        let store = if authorized {
            MemoryTokenStore::seeded(fresh_tokens())
        } else {
            MemoryTokenStore::empty()
        };
        let auth =
            Arc::new(AuthManager::new(&config.gcal, Box::new(store)).expect("auth manager"));
        auth.load_or_init().await;

        let provider = Arc::new(
            GoogleCalendarClient::with_base_url(
                std::time::Duration::from_secs(5),
                server.uri(),
            )
            .unwrap(),
        );

        routes(Arc::new(GcalState {
            config,
            policy,
            auth,
            service_credential: None,
            provider,
            time_zone: chrono_tz::UTC,
        }))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn created_event_body() -> serde_json::Value {
        serde_json::json!({
            "id": "evt-1",
            "status": "confirmed",
            "htmlLink": "https://calendar.google.com/event?eid=evt-1",
            "conferenceData": {
                "entryPoints": [
                    { "entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij" }
                ]
            }
        })
    }

    #[test]
    fn configured_time_zone_is_validated_up_front() {
        let mut gcal = app_config().gcal;
        assert_eq!(resolve_time_zone(&gcal), Ok(chrono_tz::UTC));

        gcal.time_zone = Some("Europe/Zurich".to_string());
        assert_eq!(resolve_time_zone(&gcal), Ok(chrono_tz::Europe::Zurich));

        gcal.time_zone = None;
        assert_eq!(resolve_time_zone(&gcal), Ok(chrono_tz::UTC));

        gcal.time_zone = Some("Zurich".to_string());
        assert_eq!(
            resolve_time_zone(&gcal),
            Err("Unknown gcal.time_zone 'Zurich'".to_string())
        );
    }

    #[tokio::test]
    async fn auth_status_reports_the_credential_state() {
        let server = MockServer::start().await;

        let app = app_against(&server, true).await;
        let response = app
            .oneshot(Request::get("/auth/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authorized"], true);
        assert_eq!(body["degraded_mode"], false);

        let app = app_against(&server, false).await;
        let response = app
            .oneshot(Request::get("/auth/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["authorized"], false);
    }

    #[tokio::test]
    async fn auth_status_flags_degraded_mode_with_a_fallback_credential() {
        let server = MockServer::start().await;
        let config = Arc::new(app_config());
        let policy = Arc::new(WorkingHoursPolicy::from_config(&config.booking).unwrap());
        let auth = Arc::new(
            AuthManager::new(&config.gcal, Box::new(MemoryTokenStore::empty()))
                .expect("auth manager"),
        );
        auth.load_or_init().await;
        let provider = Arc::new(
            GoogleCalendarClient::with_base_url(
                std::time::Duration::from_secs(5),
                server.uri(),
            )
            .unwrap(),
        );
        let app = routes(Arc::new(GcalState {
            config,
            policy,
            auth,
            service_credential: Some(Arc::new(StaticTokenSource { token: "sa-token" })),
            provider,
            time_zone: chrono_tz::UTC,
        }));

        let response = app
            .oneshot(Request::get("/auth/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["authorized"], false);
        assert_eq!(body["degraded_mode"], true);
    }

    #[tokio::test]
    async fn availability_returns_slots_for_the_requested_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })),
            )
            .mount(&server)
            .await;

        let start_date = (Utc::now() + Duration::days(7)).date_naive();
        let app = app_against(&server, true).await;
        let uri = format!("/availability?start_date={start_date}&days=1");
        let response = app
            .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["slot_duration_minutes"], 30);
        assert_eq!(body["timezone"], "UTC");
        let day = &body["available_slots"][start_date.to_string()];
        assert_eq!(day[0], "09:00");
        assert_eq!(day.as_array().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn availability_rejects_a_malformed_start_date() {
        let server = MockServer::start().await;
        let app = app_against(&server, true).await;
        let response = app
            .oneshot(
                Request::get("/availability?start_date=tomorrow")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    fn booking_body(meeting_date: &str) -> serde_json::Value {
        serde_json::json!({
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "+41 79 000 00 00",
            "companyName": "Analytical Engines",
            "role": "Founder",
            "industry": "Computing",
            "goals": "Discuss the difference engine",
            "meetingDate": meeting_date,
            "meetingTime": "10:00",
            "timezone": "UTC"
        })
    }

    fn post_booking(body: &serde_json::Value) -> Request<Body> {
        Request::post("/bookings")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn booking_round_trip_returns_created_with_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": [] })),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(query_param("conferenceDataVersion", "1"))
            .and(query_param("sendUpdates", "all"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created_event_body()))
            .mount(&server)
            .await;

        let date = (Utc::now() + Duration::days(2)).date_naive();
        let app = app_against(&server, true).await;
        let response = app
            .oneshot(post_booking(&booking_body(&date.to_string())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["event_id"], "evt-1");
        assert_eq!(body["meet_link"], "https://meet.google.com/abc-defg-hij");
        assert_eq!(body["attendee_email"], "ada@example.com");
    }

    #[tokio::test]
    async fn policy_rejection_surfaces_the_message_verbatim() {
        let server = MockServer::start().await;
        let date = Utc::now().date_naive();
        let app = app_against(&server, true).await;
        let response = app
            .oneshot(post_booking(&booking_body(&date.to_string())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            String::from_utf8_lossy(&bytes),
            "Bookings must be made at least 24 hours in advance"
        );
    }

    #[tokio::test]
    async fn booking_without_any_credential_is_service_unavailable() {
        let server = MockServer::start().await;
        let date = (Utc::now() + Duration::days(2)).date_naive();
        let app = app_against(&server, false).await;
        let response = app
            .oneshot(post_booking(&booking_body(&date.to_string())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn grant_start_without_client_credentials_is_unavailable() {
        let server = MockServer::start().await;
        let app = app_against(&server, false).await;
        let response = app
            .oneshot(Request::get("/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // No client credentials configured in the test fixture.
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn calendar_debug_listing_requires_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/calendarList"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    { "id": "primary", "summary": "Operator", "primary": true }
                ]
            })))
            .mount(&server)
            .await;

        let app = app_against(&server, true).await;
        let response = app
            .oneshot(Request::get("/auth/calendars").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body[0]["id"], "primary");
        assert_eq!(body[0]["primary"], true);

        let app = app_against(&server, false).await;
        let response = app
            .oneshot(Request::get("/auth/calendars").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn callback_without_a_code_is_a_bad_request() {
        let server = MockServer::start().await;
        let app = app_against(&server, false).await;
        let response = app
            .oneshot(Request::get("/auth/callback").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
