use super::config::SecurityConfig;
use super::overrides::RouteOverrides;
use super::policy::{ResolvedPolicy, request_is_secure};
use axum::body::Body;
use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderValue, Response, StatusCode, header},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use tower::Service;

/// Build a Tower layer that adds security headers to responses
///
/// Returns `None` when the configuration is disabled. The layer must wrap the
/// router with `Router::layer` so the matched route template is visible for
/// override lookups.
pub fn build_security_headers_layer(
    config: &SecurityConfig,
    overrides: RouteOverrides,
) -> Option<SecurityHeadersLayer> {
    if !config.enabled {
        return None;
    }

    tracing::debug!(
        route_overrides = overrides.len(),
        hsts = config.strict_transport_security,
        force_https = config.force_https,
        "Security headers layer configured"
    );

    Some(SecurityHeadersLayer {
        config: Arc::new(config.clone()),
        overrides: Arc::new(overrides),
    })
}

/// Tower layer that adds security headers
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    config: Arc<SecurityConfig>,
    overrides: Arc<RouteOverrides>,
}

impl<S> tower::Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService {
            inner,
            config: self.config.clone(),
            overrides: self.overrides.clone(),
        }
    }
}

/// Tower service that adds security headers
#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
    config: Arc<SecurityConfig>,
    overrides: Arc<RouteOverrides>,
}

impl<S> Service<Request> for SecurityHeadersService<S>
where
    S: Service<Request, Response = Response<Body>> + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let config = self.config.clone();
        let overrides = self.overrides.clone();
        let secure = request_is_secure(&req, config.trust_forwarded_proto);
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned());

        if config.force_https && !secure {
            if let Some(mut redirect) = https_redirect(&req, config.force_https_permanent) {
                tracing::debug!(uri = %req.uri(), "Redirecting insecure request to https");
                let route_override = route.as_deref().and_then(|path| overrides.get(path));
                add_security_headers(&mut redirect, &config, route_override, secure);
                return Box::pin(async move { Ok(redirect) });
            }
        }

        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            let route_override = route.as_deref().and_then(|path| overrides.get(path));
            add_security_headers(&mut response, &config, route_override, secure);
            Ok(response)
        })
    }
}

fn add_security_headers<B>(
    response: &mut Response<B>,
    config: &SecurityConfig,
    route_override: Option<&super::RouteOverride>,
    secure: bool,
) {
    let headers = response.headers_mut();
    for (name, value) in ResolvedPolicy::resolve(config, route_override).headers(secure) {
        headers.insert(name, value);
    }
}

/// Redirect to the https form of the request URL, if the host is known
fn https_redirect(req: &Request, permanent: bool) -> Option<Response<Body>> {
    let host = match req.uri().authority() {
        Some(authority) => authority.as_str().to_owned(),
        None => req.headers().get(header::HOST)?.to_str().ok()?.to_owned(),
    };
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let location = HeaderValue::from_str(&format!("https://{}{}", host, path)).ok()?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = if permanent {
        StatusCode::MOVED_PERMANENTLY
    } else {
        StatusCode::FOUND
    };
    response.headers_mut().insert(header::LOCATION, location);
    Some(response)
}
