//! Path-segment trie resolving `(path, method)` to a route handler.
//!
//! Every node stands for one non-empty path segment. Resolution walks down the
//! trie as far as the request path allows, and the segments left over are
//! handed to the handler as its suffix, so one registration serves a whole
//! subtree:
//!
//! ```
//! use http::Method;
//! use sealed_web::{handler_fn, Router};
//!
//! let router = Router::builder()
//!     .route("/files", &[Method::GET], 0, handler_fn(|_route, _exchange| Box::pin(async { Ok(()) })))
//!     .build();
//!
//! let matched = router.resolve("/files/docs/a.txt", &Method::GET).unwrap();
//! assert_eq!(matched.suffix(), ["docs", "a.txt"]);
//! ```
//!
//! Matching is case-sensitive and segment-exact. When the node reached has
//! handlers for other methods only, resolution fails with
//! [`RouteError::MethodNotAllowed`], and with [`RouteError::NotFound`] when it
//! has none. `HEAD` falls back to the `GET` handler.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use sealed_http::protocol::StatusError;
use thiserror::Error;
use tracing::debug;

use crate::handler::RouteHandler;

pub type SharedHandler = Arc<dyn RouteHandler>;

#[derive(Default)]
struct Node {
    children: HashMap<String, Node>,
    // registration order, used for `Allow`
    handlers: Vec<(Method, Registered)>,
}

struct Registered {
    priority: i32,
    handler: SharedHandler,
}

impl Node {
    fn handler(&self, method: &Method) -> Option<&SharedHandler> {
        self.handlers.iter().find(|(m, _)| m == method).map(|(_, registered)| &registered.handler)
    }

    fn install(&mut self, method: Method, priority: i32, handler: SharedHandler) -> bool {
        match self.handlers.iter_mut().find(|(m, _)| *m == method) {
            Some((_, registered)) if priority > registered.priority => {
                *registered = Registered { priority, handler };
                true
            }
            Some(_) => false,
            None => {
                self.handlers.push((method, Registered { priority, handler }));
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no route found")]
    NotFound,

    #[error("method not allowed, allowed: {}", allowed.join(", "))]
    MethodNotAllowed { allowed: Vec<String> },
}

impl From<RouteError> for StatusError {
    fn from(error: RouteError) -> Self {
        match error {
            RouteError::NotFound => StatusError::not_found(),
            RouteError::MethodNotAllowed { allowed } => {
                StatusError::method_not_allowed().with_header("Allow", allowed.join(", "))
            }
        }
    }
}

/// A resolved route: the handler plus the path segments it did not consume.
pub struct RouteMatch<'router> {
    handler: &'router SharedHandler,
    suffix: Vec<String>,
}

impl<'router> RouteMatch<'router> {
    pub fn handler(&self) -> &'router SharedHandler {
        self.handler
    }

    pub fn suffix(&self) -> &[String] {
        &self.suffix
    }

    pub fn into_suffix(self) -> Vec<String> {
        self.suffix
    }
}

impl fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch").field("suffix", &self.suffix).finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct Router {
    root: Node,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder { router: Router::new() }
    }

    /// Installs `handler` at `path` for each of `methods`.
    ///
    /// An existing handler for the same node and method is replaced only when
    /// `priority` is strictly greater than the one it was registered with.
    pub fn register(&mut self, path: &str, methods: &[Method], priority: i32, handler: impl RouteHandler + 'static) {
        self.register_shared(path, methods, priority, Arc::new(handler));
    }

    /// Like [`register`](Self::register), for a handler also installed elsewhere.
    pub fn register_shared(&mut self, path: &str, methods: &[Method], priority: i32, handler: SharedHandler) {
        let node = segments(path).fold(&mut self.root, |node, segment| node.children.entry(segment.to_owned()).or_default());

        for method in methods {
            if !node.install(method.clone(), priority, Arc::clone(&handler)) {
                debug!(path, %method, priority, "route kept, an existing handler has equal or higher priority");
            }
        }
    }

    /// Resolves `path` (without query) for `method`.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<RouteMatch<'_>, RouteError> {
        let mut node = &self.root;
        let mut rest = segments(path).peekable();
        while let Some(child) = rest.peek().and_then(|segment| node.children.get(*segment)) {
            node = child;
            rest.next();
        }

        let handler = node.handler(method).or_else(|| match *method {
            Method::HEAD => node.handler(&Method::GET),
            _ => None,
        });

        match handler {
            Some(handler) => Ok(RouteMatch { handler, suffix: rest.map(str::to_owned).collect() }),
            None if node.handlers.is_empty() => Err(RouteError::NotFound),
            None => Err(RouteError::MethodNotAllowed {
                allowed: node.handlers.iter().map(|(method, _)| method.to_string()).collect(),
            }),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct RouterBuilder {
    router: Router,
}

impl RouterBuilder {
    pub fn route(mut self, path: &str, methods: &[Method], priority: i32, handler: impl RouteHandler + 'static) -> Self {
        self.router.register(path, methods, priority, handler);
        self
    }

    pub fn build(self) -> Router {
        self.router
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RouteContext;
    use async_trait::async_trait;
    use http::StatusCode;
    use sealed_http::connection::Exchange;
    use sealed_http::protocol::HandlerError;

    struct Noop;

    #[async_trait]
    impl RouteHandler for Noop {
        async fn call(&self, _route: RouteContext, _exchange: &mut Exchange<'_>) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    fn noop() -> SharedHandler {
        Arc::new(Noop)
    }

    fn resolves_to(router: &Router, path: &str, method: &Method, expected: &SharedHandler) -> bool {
        Arc::ptr_eq(router.resolve(path, method).unwrap().handler(), expected)
    }

    #[test]
    fn test_higher_priority_wins() {
        let (first, second) = (noop(), noop());
        let mut router = Router::new();
        router.register_shared("/a/b", &[Method::GET], 1, Arc::clone(&first));
        router.register_shared("/a/b", &[Method::GET], 0, Arc::clone(&second));

        assert!(resolves_to(&router, "/a/b", &Method::GET, &first));
    }

    #[test]
    fn test_equal_priority_keeps_first() {
        let (first, second, third) = (noop(), noop(), noop());
        let mut router = Router::new();
        router.register_shared("/a", &[Method::GET], 3, Arc::clone(&first));
        router.register_shared("/a", &[Method::GET], 3, Arc::clone(&second));
        assert!(resolves_to(&router, "/a", &Method::GET, &first));

        router.register_shared("/a", &[Method::GET], 4, Arc::clone(&third));
        assert!(resolves_to(&router, "/a", &Method::GET, &third));
    }

    #[test]
    fn test_suffix_is_returned() {
        let handler = noop();
        let mut router = Router::new();
        router.register_shared("/a/b", &[Method::GET], 1, Arc::clone(&handler));

        let matched = router.resolve("/a/b/c/d", &Method::GET).unwrap();
        assert_eq!(matched.suffix(), ["c", "d"]);
        assert!(Arc::ptr_eq(matched.handler(), &handler));
    }

    #[test]
    fn test_empty_segments_are_ignored() {
        let router = Router::builder().route("a//b/", &[Method::GET], 0, Noop).build();

        let matched = router.resolve("//a/b//c", &Method::GET).unwrap();
        assert_eq!(matched.suffix(), ["c"]);
    }

    #[test]
    fn test_root_serves_everything_below() {
        let (root, api) = (noop(), noop());
        let mut router = Router::new();
        router.register_shared("/", &[Method::GET], 0, Arc::clone(&root));
        router.register_shared("/api", &[Method::POST], 0, Arc::clone(&api));

        assert!(resolves_to(&router, "/", &Method::GET, &root));
        assert!(resolves_to(&router, "/index.html", &Method::GET, &root));
        assert!(resolves_to(&router, "/api", &Method::POST, &api));
        assert_eq!(router.resolve("/index.html", &Method::GET).unwrap().suffix(), ["index.html"]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let router = Router::builder().route("/Docs", &[Method::GET], 0, Noop).build();

        assert_eq!(router.resolve("/docs", &Method::GET).unwrap_err(), RouteError::NotFound);
    }

    #[test]
    fn test_not_found_when_node_has_no_handlers() {
        let router = Router::builder().route("/a/b", &[Method::GET], 0, Noop).build();

        assert_eq!(router.resolve("/a", &Method::GET).unwrap_err(), RouteError::NotFound);
        assert_eq!(router.resolve("/x.txt", &Method::POST).unwrap_err(), RouteError::NotFound);
    }

    #[test]
    fn test_method_not_allowed() {
        let router = Router::builder().route("/upload", &[Method::GET, Method::PUT], 0, Noop).build();

        let error = router.resolve("/upload", &Method::POST).unwrap_err();
        assert_eq!(error, RouteError::MethodNotAllowed { allowed: vec!["GET".into(), "PUT".into()] });

        let status: StatusError = error.into();
        assert_eq!(status.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(status.headers().get("allow"), Some("GET, PUT"));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let (get, head) = (noop(), noop());
        let mut router = Router::new();
        router.register_shared("/page", &[Method::GET], 0, Arc::clone(&get));
        router.register_shared("/custom", &[Method::GET], 0, Arc::clone(&get));
        router.register_shared("/custom", &[Method::HEAD], 0, Arc::clone(&head));

        assert!(resolves_to(&router, "/page", &Method::HEAD, &get));
        assert!(resolves_to(&router, "/custom", &Method::HEAD, &head));
    }
}
