use axum::{
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::i18n::{DEFAULT_LOCALE, Locale};
use crate::session::SessionPrincipal;

pub const LOCALE_COOKIE: &str = "locale";

/// Per-request values shared by middleware and handlers.
///
/// Built by [`locale_layer`]; the access gate fills in `principal`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub locale: Locale,
    pub principal: Option<SessionPrincipal>,
}

/// Read the `locale` cookie. The flag is true when the cookie is missing or
/// names an unsupported locale and should be (re)written.
pub fn resolve_locale(jar: &CookieJar) -> (Locale, bool) {
    match jar.get(LOCALE_COOKIE).and_then(|c| Locale::parse(c.value())) {
        Some(locale) => (locale, false),
        None => (DEFAULT_LOCALE, true),
    }
}

fn locale_cookie(locale: Locale) -> Cookie<'static> {
    Cookie::build((LOCALE_COOKIE, locale.as_str()))
        .path("/")
        .build()
}

/// Resolve the caller's locale and attach the [`RequestContext`].
pub async fn locale_layer(jar: CookieJar, mut req: Request, next: Next) -> Response {
    let (locale, needs_write) = resolve_locale(&jar);
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    req.extensions_mut().insert(RequestContext {
        request_id,
        locale,
        principal: None,
    });

    let response = next.run(req).await;
    if needs_write {
        (CookieJar::new().add(locale_cookie(locale)), response).into_response()
    } else {
        response
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cookie_uses_default_and_writes() {
        assert_eq!(resolve_locale(&CookieJar::new()), (DEFAULT_LOCALE, true));
    }

    #[test]
    fn test_known_locale_is_kept() {
        let jar = CookieJar::new().add(Cookie::new(LOCALE_COOKIE, "en-US"));
        assert_eq!(resolve_locale(&jar), (Locale::EnUs, false));
    }

    #[test]
    fn test_unknown_locale_is_rewritten() {
        let jar = CookieJar::new().add(Cookie::new(LOCALE_COOKIE, "fr-FR"));
        assert_eq!(resolve_locale(&jar), (DEFAULT_LOCALE, true));
    }

    #[test]
    fn test_locale_cookie_is_readable_by_scripts() {
        let cookie = locale_cookie(Locale::TrTr);
        assert_eq!(cookie.value(), "tr-TR");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), None);
    }
}
