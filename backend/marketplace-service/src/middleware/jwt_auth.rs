/// JWT authentication middleware for Bearer token validation
/// Extracts user_id from JWT claims and adds it to request extensions
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::ErrorUnauthorized,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use uuid::Uuid;

use crate::security::jwt;

/// User ID extracted from JWT token
#[derive(Debug, Clone)]
pub struct UserId(pub Uuid);

/// Optional identity for endpoints that serve anonymous callers too.
/// A missing Authorization header resolves to None; a header that is
/// present but invalid is still a 401.
#[derive(Debug, Clone)]
pub struct MaybeUserId(pub Option<Uuid>);

fn token_from_header(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

fn user_id_from_token(token: &str) -> Result<Uuid, Error> {
    let token_data = jwt::validate_token(token).map_err(|e| {
        tracing::debug!("Token validation failed: {}", e);
        ErrorUnauthorized("Invalid or expired token")
    })?;
    Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| ErrorUnauthorized("Invalid user ID in token"))
}

/// JWT authentication middleware factory
pub struct JwtAuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtAuthMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            // Copy the header to an owned String before touching
            // extensions_mut, so no RefCell borrow is still live
            let auth_header = match req.headers().get("Authorization") {
                Some(header) => match header.to_str() {
                    Ok(h) => h.to_string(),
                    Err(_) => {
                        return Err(ErrorUnauthorized("Invalid Authorization header"));
                    }
                },
                None => {
                    return Err(ErrorUnauthorized("Missing Authorization header"));
                }
            };

            let token = match token_from_header(&auth_header) {
                Some(t) => t,
                None => {
                    return Err(ErrorUnauthorized(
                        "Invalid Authorization scheme, expected Bearer",
                    ));
                }
            };

            let user_id = user_id_from_token(token)?;

            req.extensions_mut().insert(UserId(user_id));

            let res = service.call(req).await?;
            Ok(res)
        })
    }
}

fn validate_bearer(req: &HttpRequest) -> Result<Uuid, Error> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ErrorUnauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ErrorUnauthorized("Invalid Authorization header"))?;

    let token = token_from_header(header)
        .ok_or_else(|| ErrorUnauthorized("Invalid Authorization scheme, expected Bearer"))?;

    user_id_from_token(token)
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    /// Prefers the identity the middleware stored in the request
    /// extensions; on routes that mix public and protected methods the
    /// middleware is not mounted, so the token is validated here.
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if let Some(user_id) = req.extensions().get::<UserId>().cloned() {
            return ready(Ok(user_id));
        }
        ready(validate_bearer(req).map(UserId))
    }
}

impl FromRequest for MaybeUserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        if req.headers().get("Authorization").is_none() {
            return ready(Ok(MaybeUserId(None)));
        }
        ready(validate_bearer(req).map(|id| MaybeUserId(Some(id))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::jwt;

    #[test]
    fn test_user_id_creation() {
        let id = Uuid::new_v4();
        let user_id = UserId(id);
        assert_eq!(user_id.0, id);
    }

    #[test]
    fn test_token_from_header() {
        assert_eq!(token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(token_from_header("Basic abc"), None);
        assert_eq!(token_from_header("bearer abc"), None);
    }

    #[test]
    fn test_user_id_from_valid_token() {
        jwt::initialize_keys("middleware-test-secret");
        let id = Uuid::new_v4();
        let token = jwt::generate_access_token(id, 5).unwrap();
        assert_eq!(user_id_from_token(&token).unwrap(), id);
    }

    #[test]
    fn test_user_id_from_garbage_token() {
        jwt::initialize_keys("middleware-test-secret");
        assert!(user_id_from_token("garbage").is_err());
    }
}
