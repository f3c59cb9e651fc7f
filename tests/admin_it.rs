mod harness;

use axum::http::{header, Method, StatusCode};
use harness::{
    body_json, body_text, dispatcher, env, form, get_with_cookie, location, login,
    ready_dispatcher, request, session_cookie, urlencode, Behavior, FakeConnector, ADMIN_EMAIL,
    ADMIN_PASSWORD,
};

#[tokio::test]
async fn login_sets_session_and_opens_dashboard() {
    let app = ready_dispatcher();

    let body = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin");

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("admin_session="));
    assert!(set_cookie.contains("HttpOnly;"));
    assert!(set_cookie.contains("Path=/admin;"));
    assert!(!set_cookie.contains("Secure"));

    let cookie = session_cookie(&response).unwrap();
    let response = get_with_cookie(&app, "/admin", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<h1>Dashboard</h1>"));
    assert!(page.contains("Materials"));
}

#[tokio::test]
async fn wrong_password_rerenders_login_with_401() {
    let app = ready_dispatcher();

    let body = format!("email={}&password=nope", urlencode(ADMIN_EMAIL));
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(response).await.contains("Invalid email or password"));
}

#[tokio::test]
async fn logins_are_rejected_without_configured_credentials() {
    let app = dispatcher(
        FakeConnector::new(Behavior::Succeed),
        env(&[("DATABASE_URL", "postgres://db")]),
    );

    let body = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_only_redirects_inside_the_panel() {
    let app = ready_dispatcher();
    let credentials = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );

    let body = format!("{credentials}&next={}", urlencode("https://evil.example/admin"));
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(location(&response), "/admin");

    let body = format!("{credentials}&next={}", urlencode("/admin/resources/materials"));
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(location(&response), "/admin/resources/materials");
}

#[tokio::test]
async fn login_ignores_next_values_unfit_for_a_location_header() {
    let app = ready_dispatcher();
    let credentials = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );

    for next in ["/admin\nX-Evil: 1", "/admin/\\evil.example", "/admin/\u{1}"] {
        let body = format!("{credentials}&next={}", urlencode(next));
        let response = form(&app, "/admin/login", &body, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "next={next:?}");
        assert_eq!(location(&response), "/admin");
        assert!(response.headers().get("x-evil").is_none());
        assert!(session_cookie(&response).is_some());
    }
}

#[tokio::test]
async fn unauthenticated_access_is_gated() {
    let app = ready_dispatcher();

    let response = request(&app, Method::GET, "/admin/resources/materials", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<h1>Log in</h1>"));

    let response = form(&app, "/admin/resources/materials", "name=Sneaky", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");

    let response = request(&app, Method::GET, "/api/v1/materials", None).await;
    assert_eq!(body_json(response).await["total"], 0);
}

#[tokio::test]
async fn tampered_session_is_ignored() {
    let app = ready_dispatcher();
    let cookie = login(&app).await;
    let tampered = format!("{cookie}x");

    let response = get_with_cookie(&app, "/admin", &tampered).await;
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_text(response).await;
    assert!(page.contains("<h1>Log in</h1>"));
    assert!(!page.contains("<h1>Dashboard</h1>"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = ready_dispatcher();
    let cookie = login(&app).await;

    let response = get_with_cookie(&app, "/admin/logout", &cookie).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/login");
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cleared.starts_with("admin_session=;"));
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn records_can_be_managed_from_the_panel() {
    let app = ready_dispatcher();
    let cookie = login(&app).await;

    let response = form(
        &app,
        "/admin/resources/materials",
        "name=Copper+wire&description=&quantity=5&unit=m",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/resources/materials/records/1");

    let response = get_with_cookie(&app, "/admin/resources/materials/records/1", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Copper wire"));

    let response = get_with_cookie(&app, "/admin/resources/materials", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Copper wire"));

    let response = get_with_cookie(&app, "/admin/resources/materials/records/1/edit", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = form(
        &app,
        "/admin/resources/materials/records/1/edit",
        "name=Copper+wire&description=Spool&quantity=9&unit=",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = request(&app, Method::GET, "/api/v1/materials/1", None).await;
    let material = body_json(response).await;
    assert_eq!(material["quantity"], 9);
    assert_eq!(material["unit"], "m");
    assert_eq!(material["description"], "Spool");

    let response = form(
        &app,
        "/admin/resources/materials/records/1/delete",
        "",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/admin/resources/materials");

    let response = request(&app, Method::GET, "/api/v1/materials/1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_forms_rerender_with_422() {
    let app = ready_dispatcher();
    let cookie = login(&app).await;

    let response = form(
        &app,
        "/admin/resources/materials",
        "name=&quantity=1&unit=kg",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Name cannot be empty"));

    let response = form(
        &app,
        "/admin/resources/materials",
        "name=Bolts&quantity=many&unit=kg",
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Quantity must be a whole number"));
}

#[tokio::test]
async fn unknown_resources_and_records_are_404() {
    let app = ready_dispatcher();
    let cookie = login(&app).await;

    let response = get_with_cookie(&app, "/admin/resources/widgets", &cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["type"], "unknown_resource");

    let response = get_with_cookie(&app, "/admin/resources/materials/records/42", &cookie).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn production_sessions_use_secure_cookies() {
    let app = dispatcher(
        FakeConnector::new(Behavior::Succeed),
        env(&[
            ("DATABASE_URL", "postgres://db"),
            ("APP_ENV", "production"),
            ("COOKIE_SECRET", harness::PRODUCTION_SECRET),
            ("ADMIN_EMAIL", ADMIN_EMAIL),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ]),
    );

    let body = format!(
        "email={}&password={}",
        urlencode(ADMIN_EMAIL),
        urlencode(ADMIN_PASSWORD)
    );
    let response = form(&app, "/admin/login", &body, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(set_cookie.to_str().unwrap().contains("Secure;"));
}
