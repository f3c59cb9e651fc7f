use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::Utc;
use serde::Deserialize;
use tera::Context;

use super::AdminState;
use crate::session::{clear_session_cookie, read_cookie, session_cookie, SESSION_COOKIE};

/// The signed-in administrator, attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminUser {
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Option<AdminUser>;
}

/// Single administrator configured through `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
pub struct DefaultAuthProvider {
    credentials: Option<(String, String)>,
}

impl DefaultAuthProvider {
    pub fn new(email: Option<String>, password: Option<String>) -> Self {
        let credentials = match (email, password) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => {
                tracing::warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set; every admin login will be rejected");
                None
            }
        };
        Self { credentials }
    }
}

#[async_trait]
impl AuthProvider for DefaultAuthProvider {
    async fn authenticate(&self, email: &str, password: &str) -> Option<AdminUser> {
        let (expected_email, expected_password) = self.credentials.as_ref()?;
        let email_ok = expected_email.eq_ignore_ascii_case(email.trim());
        let password_ok =
            constant_time_eq::constant_time_eq(expected_password.as_bytes(), password.as_bytes());
        (email_ok && password_ok).then(|| AdminUser {
            email: expected_email.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

fn render_login(
    state: &AdminState,
    status: StatusCode,
    email: &str,
    next: &str,
    error: Option<&str>,
) -> Response {
    let mut context = Context::new();
    context.insert("root_path", state.registry.root_path());
    context.insert("resources", &Vec::<String>::new());
    context.insert("user", &Option::<String>::None);
    context.insert("email", email);
    context.insert("next", next);
    context.insert("error", &error);

    match state.registry.templates().render("admin/login.html", &context) {
        Ok(page) => (status, page).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Only redirect back into the admin panel after login.
///
/// The target must stay under the admin root and be usable verbatim as a
/// `Location` header.
fn safe_next<'a>(state: &'a AdminState, next: Option<&'a str>) -> &'a str {
    let root = state.registry.root_path();
    match next {
        Some(n) if is_panel_path(root, n) => n,
        _ => root,
    }
}

fn is_panel_path(root: &str, path: &str) -> bool {
    let under_root = path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'));
    under_root
        && !path.starts_with("//")
        && !path.contains("://")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
        && HeaderValue::from_str(path).is_ok()
}

/// `303 See Other` to `location`, falling back to the admin root when the
/// value cannot be sent as a header.
fn see_other(state: &AdminState, location: &str) -> Response {
    let location = HeaderValue::from_str(location).or_else(|_| {
        tracing::warn!("Redirect target is not a valid header value; using admin root");
        HeaderValue::from_str(state.registry.root_path())
    });
    match location {
        Ok(location) => (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Admin root is not a valid redirect target");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn login_page(State(state): State<AdminState>) -> Response {
    let next = state.registry.root_path().to_string();
    render_login(&state, StatusCode::OK, "", &next, None)
}

pub async fn login(State(state): State<AdminState>, Form(form): Form<LoginForm>) -> Response {
    let next = safe_next(&state, form.next.as_deref()).to_string();

    let Some(user) = state.auth.authenticate(&form.email, &form.password).await else {
        tracing::warn!(email = %form.email, "Admin login rejected");
        return render_login(
            &state,
            StatusCode::UNAUTHORIZED,
            &form.email,
            &next,
            Some("Invalid email or password"),
        );
    };

    tracing::info!(email = %user.email, "Admin logged in");
    let value = state.signer.issue(&user.email, Utc::now());
    let cookie = session_cookie(
        &value,
        state.registry.root_path(),
        state.signer.ttl(),
        state.secure_cookies,
    );
    ([(header::SET_COOKIE, cookie)], see_other(&state, &next)).into_response()
}

pub async fn logout(State(state): State<AdminState>) -> Response {
    let root = state.registry.root_path();
    let cookie = clear_session_cookie(root, state.secure_cookies);
    (
        [(header::SET_COOKIE, cookie)],
        Redirect::to(&format!("{root}/login")),
    )
        .into_response()
}

/// Gate for every protected admin page.
///
/// Unauthenticated page views get the login form in place; anything else is
/// sent to the login page.
pub async fn require_session(
    State(state): State<AdminState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = read_cookie(request.headers(), SESSION_COOKIE)
        .and_then(|value| state.signer.verify(value, Utc::now()));

    match claims {
        Some(claims) => {
            request.extensions_mut().insert(AdminUser {
                email: claims.email,
            });
            next.run(request).await
        }
        None if request.method() == Method::GET || request.method() == Method::HEAD => {
            let path = request.uri().path().to_string();
            render_login(&state, StatusCode::OK, "", safe_next(&state, Some(&path)), None)
        }
        None => {
            let root = state.registry.root_path();
            Redirect::to(&format!("{root}/login")).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_provider_checks_both_fields() {
        let provider = DefaultAuthProvider::new(
            Some("admin@example.com".into()),
            Some("hunter22".into()),
        );
        assert!(provider.authenticate("ADMIN@example.com", "hunter22").await.is_some());
        assert!(provider.authenticate("admin@example.com", "hunter2").await.is_none());
        assert!(provider.authenticate("other@example.com", "hunter22").await.is_none());
    }

    #[tokio::test]
    async fn provider_without_credentials_rejects_everyone() {
        let provider = DefaultAuthProvider::new(None, Some("pw".into()));
        assert!(provider.authenticate("", "pw").await.is_none());
    }

    #[test]
    fn panel_paths_must_be_plain_admin_urls() {
        assert!(is_panel_path("/admin", "/admin"));
        assert!(is_panel_path("/admin", "/admin/resources/materials?page=2"));
        assert!(!is_panel_path("/admin", "/administrator"));
        assert!(!is_panel_path("/admin", "/admin\nX-Evil: 1"));
        assert!(!is_panel_path("/admin", "/admin/\\evil.example"));
        assert!(!is_panel_path("/admin", "https://evil.example/admin"));
        assert!(!is_panel_path("/admin", "/admin/\u{7f}"));
    }
}
