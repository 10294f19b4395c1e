//! Per-request context — the request plus a type-erased extension map.
//!
//! Middleware signals to each other through extensions: an upstream handler
//! can insert [`SkipCache`](crate::cache::SkipCache) to bypass the response
//! cache, and the cache records the computed [`CacheKey`](crate::cache::CacheKey)
//! for downstream handlers.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions map — used to inject per-request state
/// into handlers without requiring handlers to know about each other's types.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Returns `true` if a value of type `T` is present
    pub fn contains<T>(&self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Remove a value from the extensions map
    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// Per-request context handed through the middleware pipeline.
pub struct Context {
    request: Request,
    extensions: Extensions,
}

impl Context {
    /// Create a new context from a request
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Deserialize the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Marker(&'static str);

    #[test]
    fn extensions_are_keyed_by_type() {
        let mut ext = Extensions::new();
        assert!(!ext.contains::<Marker>());

        ext.insert(Marker("first"));
        ext.insert(Marker("second"));
        ext.insert(7u32);

        assert_eq!(ext.get::<Marker>(), Some(&Marker("second")));
        assert_eq!(ext.get::<u32>(), Some(&7));
        assert_eq!(ext.remove::<Marker>(), Some(Marker("second")));
        assert!(!ext.contains::<Marker>());
    }

    #[test]
    fn context_exposes_request_and_body() {
        let raw = b"POST /items HTTP/1.1\r\nContent-Length: 12\r\n\r\n{\"name\":\"a\"}";
        let (request, _) = Request::parse(raw).unwrap();
        let mut ctx = Context::new(request);
        ctx.extensions_mut().insert(Marker("seen"));

        assert_eq!(ctx.request().path(), "/items");
        assert!(ctx.extensions().contains::<Marker>());
        let body: serde_json::Value = ctx.json().unwrap();
        assert_eq!(body["name"], "a");
    }
}
