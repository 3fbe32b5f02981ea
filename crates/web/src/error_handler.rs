//! Registry of error renderers keyed by status code.
//!
//! A renderer returns the response for a [`StatusError`], or `None` to pass.
//! It also sees the request that failed, when the failure happened after one
//! was assembled.
//! Lookup prefers the renderer registered for the exact status, then the
//! default one; when both pass, the connection falls back to its plain-text
//! `"{code} {reason}"` body. Status, reason and extra headers of the error are
//! applied to the rendered response by the connection.

use std::collections::HashMap;
use std::fmt;

use http::StatusCode;
#[cfg(test)]
use mockall::automock;
use sealed_http::protocol::{Request, Response, StatusError};

#[cfg_attr(test, automock)]
pub trait ErrorHandler: Send + Sync {
    fn render<'r>(&self, error: &StatusError, request: Option<&'r Request>) -> Option<Response>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&StatusError, Option<&Request>) -> Option<Response> + Send + Sync,
{
    fn render<'r>(&self, error: &StatusError, request: Option<&'r Request>) -> Option<Response> {
        (self)(error, request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorScope {
    Status(StatusCode),
    Default,
}

impl From<StatusCode> for ErrorScope {
    fn from(status: StatusCode) -> Self {
        Self::Status(status)
    }
}

#[derive(Default)]
pub struct ErrorHandlers {
    by_status: HashMap<StatusCode, Box<dyn ErrorHandler>>,
    default: Option<Box<dyn ErrorHandler>>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` for `scope`, replacing any previous one.
    pub fn set(&mut self, scope: impl Into<ErrorScope>, handler: impl ErrorHandler + 'static) {
        let handler: Box<dyn ErrorHandler> = Box::new(handler);
        match scope.into() {
            ErrorScope::Status(status) => {
                self.by_status.insert(status, handler);
            }
            ErrorScope::Default => self.default = Some(handler),
        }
    }

    #[must_use]
    pub fn with(mut self, scope: impl Into<ErrorScope>, handler: impl ErrorHandler + 'static) -> Self {
        self.set(scope, handler);
        self
    }

    pub fn render(&self, error: &StatusError, request: Option<&Request>) -> Option<Response> {
        self.by_status
            .get(&error.status())
            .and_then(|handler| handler.render(error, request))
            .or_else(|| self.default.as_ref().and_then(|handler| handler.render(error, request)))
    }
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandlers")
            .field("statuses", &self.by_status.keys().collect::<Vec<_>>())
            .field("default", &self.default.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, Version};
    use sealed_http::protocol::{Headers, RequestLine};

    fn page(body: &'static str) -> Option<Response> {
        Some(Response::with_body(StatusCode::OK, "text/html", body))
    }

    fn get(path: &str) -> Request {
        Request::new(RequestLine::new(Method::GET, path, Version::HTTP_11), Headers::new(), "")
    }

    #[test]
    fn test_exact_status_preferred() {
        let mut not_found = MockErrorHandler::new();
        not_found
            .expect_render()
            .withf(|e, request| e.status() == StatusCode::NOT_FOUND && request.is_none())
            .times(1)
            .returning(|_, _| page("missing"));
        let mut fallback = MockErrorHandler::new();
        fallback.expect_render().never();

        let handlers = ErrorHandlers::new().with(StatusCode::NOT_FOUND, not_found).with(ErrorScope::Default, fallback);

        let response = handlers.render(&StatusError::not_found(), None).unwrap();
        assert_eq!(&response.body[..], b"missing");
    }

    #[test]
    fn test_default_for_other_statuses() {
        let mut not_found = MockErrorHandler::new();
        not_found.expect_render().never();
        let mut fallback = MockErrorHandler::new();
        fallback.expect_render().times(1).returning(|_, _| page("generic"));

        let handlers = ErrorHandlers::new().with(StatusCode::NOT_FOUND, not_found).with(ErrorScope::Default, fallback);

        let response = handlers.render(&StatusError::forbidden(), None).unwrap();
        assert_eq!(&response.body[..], b"generic");
    }

    #[test]
    fn test_passing_handler_falls_through_to_default() {
        let mut not_found = MockErrorHandler::new();
        not_found.expect_render().times(1).returning(|_, _| None);
        let mut fallback = MockErrorHandler::new();
        fallback
            .expect_render()
            .withf(|_, request| request.is_some_and(|r| r.path() == "/gone"))
            .times(1)
            .returning(|_, _| page("generic"));

        let handlers = ErrorHandlers::new().with(StatusCode::NOT_FOUND, not_found).with(ErrorScope::Default, fallback);

        let request = get("/gone");
        assert_eq!(&handlers.render(&StatusError::not_found(), Some(&request)).unwrap().body[..], b"generic");
    }

    #[test]
    fn test_nothing_registered() {
        assert!(ErrorHandlers::new().render(&StatusError::internal(), None).is_none());
    }

    #[test]
    fn test_closure_handler() {
        let handlers = ErrorHandlers::new().with(ErrorScope::Default, |error: &StatusError, _request: Option<&Request>| {
            Some(Response::with_body(StatusCode::OK, "text/plain", format!("oops {error}")))
        });

        let response = handlers.render(&StatusError::bad_request(), None).unwrap();
        assert_eq!(&response.body[..], b"oops 400 Bad Request");
    }

    #[test]
    fn test_page_depends_on_request() {
        let handlers = ErrorHandlers::new().with(ErrorScope::Default, |error: &StatusError, request: Option<&Request>| {
            let path = request.map_or("-", Request::path);
            Some(Response::with_body(StatusCode::OK, "text/plain", format!("{} at {path}", error.status().as_u16())))
        });

        let request = get("/docs/missing.txt");
        let response = handlers.render(&StatusError::not_found(), Some(&request)).unwrap();
        assert_eq!(&response.body[..], b"404 at /docs/missing.txt");

        let response = handlers.render(&StatusError::bad_request(), None).unwrap();
        assert_eq!(&response.body[..], b"400 at -");
    }
}
