//! Named middleware factories for config-driven stacks.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::middleware::builtin::{Echo, ErrorHandler, Logger, RequestIdMiddleware, ResponseTime};
use crate::middleware::{Middleware, SharedMiddleware};

type Factory = Arc<dyn Fn() -> SharedMiddleware + Send + Sync>;

/// Maps names to middleware factories.
///
/// Resolving builds a fresh instance per call, so the same name may appear
/// in a stack more than once.
#[derive(Clone)]
pub struct Registry {
    factories: BTreeMap<String, Factory>,
}

impl Registry {
    /// A registry with no entries.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in middleware.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("logger", || Logger);
        registry.register("response-time", || ResponseTime);
        registry.register("request-id", || RequestIdMiddleware);
        registry.register("error-handler", || ErrorHandler);
        registry.register("echo", || Echo);
        registry
    }

    /// Add or replace a named factory.
    pub fn register<F, M>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> M + Send + Sync + 'static,
        M: Middleware,
    {
        self.factories
            .insert(name.into(), Arc::new(move || Arc::new(factory()) as SharedMiddleware));
        self
    }

    /// Build the middleware registered under `name`.
    pub fn resolve(&self, name: &str) -> Result<SharedMiddleware, ConfigError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| ConfigError::NotCallable(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::from_fn;

    #[test]
    fn test_builtins_resolve() {
        let registry = Registry::default();
        for name in ["logger", "response-time", "request-id", "error-handler", "echo"] {
            let middleware = registry.resolve(name).unwrap();
            assert_eq!(middleware.name(), name);
            assert_eq!(format!("{middleware:?}"), format!("Middleware({name:?})"));
        }
    }

    #[test]
    fn test_unknown_name_is_not_callable() {
        let err = Registry::default().resolve("gzip").unwrap_err();
        assert!(matches!(err, ConfigError::NotCallable(ref name) if name == "gzip"));
    }

    #[test]
    fn test_custom_factory() {
        let mut registry = Registry::empty();
        assert!(!registry.contains("noop"));

        registry.register("noop", || {
            from_fn(|ctx, next| next.run(ctx)).named("noop")
        });
        assert!(registry.contains("noop"));
        assert_eq!(registry.resolve("noop").unwrap().name(), "noop");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["noop"]);
    }
}
