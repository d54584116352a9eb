use std::sync::Arc;

use futures::future::BoxFuture;

use crate::llm::{LLMResult, SendRequest};

/// Convert a concrete provider into an `Arc<dyn Provider>`.
/// Convenience so callers can do `provider_to_arc_dyn(Gemini::new(..))`.
pub fn provider_to_arc_dyn<P>(provider: P) -> Arc<dyn Provider>
where
    P: 'static + Provider,
{
    Arc::new(provider)
}

/// Text-in/text-out backend contract.
///
/// Returned futures borrow `self` and the request so implementations can avoid
/// cloning prompts. Providers hold no mutable state beyond configuration and
/// are shared between agents.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap configuration check (API key present, local backend enabled).
    /// Must not do network I/O.
    fn is_available(&self) -> bool;

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>>;

    /// Round-trip probe against the backend.
    fn test_connection(&self) -> BoxFuture<'_, bool>;
}

impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        (**self).send(request)
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        (**self).test_connection()
    }
}
