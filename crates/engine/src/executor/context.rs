//! Per-provider execution context handed to fill callbacks.

use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::{model::Payload, provider::Cache};

/// State visible to a provider's fill callbacks.
///
/// A fresh context is created for every provider execution and reused for
/// all of that provider's fields and documents, so its [`Cache`] is shared
/// across them and never across providers.
pub struct ExecutionContext<'a, R, D> {
    request: &'a R,
    payload: &'a mut Payload<D>,
    cancellation: &'a CancellationToken,
    cache: Option<Cache>,
}

impl<'a, R, D> ExecutionContext<'a, R, D> {
    pub(crate) fn new(request: &'a R, payload: &'a mut Payload<D>, cancellation: &'a CancellationToken) -> Self {
        Self {
            request,
            payload,
            cancellation,
            cache: None,
        }
    }

    pub fn request(&self) -> &R {
        self.request
    }

    pub fn payload(&self) -> &Payload<D> {
        self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload<D> {
        self.payload
    }

    pub fn documents(&self) -> &[D] {
        &self.payload.documents
    }

    pub fn document(&self, index: usize) -> Option<&D> {
        self.payload.documents.get(index)
    }

    pub fn document_mut(&mut self, index: usize) -> Option<&mut D> {
        self.payload.documents.get_mut(index)
    }

    /// Provider-scoped cache, created on first use.
    pub fn cache(&mut self) -> &mut Cache {
        self.cache.get_or_insert_with(Cache::new)
    }

    /// Caller-owned cancellation signal. The engine never acts on it.
    pub fn cancellation(&self) -> &CancellationToken {
        self.cancellation
    }
}

impl<R, D> fmt::Debug for ExecutionContext<'_, R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("payload", &self.payload)
            .field("cache", &self.cache)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}
