//! Planner construction and per-request plan building.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    config::PlannerOptions,
    error::{PlannerError, ValidationIssue, ValidationReport},
    executor::{Activation, Plan, check_for_cycles},
    provider::{
        FieldProvider, FieldRegistry, IndexEntry, IndexProvider, ProviderEntry, Request, validate_index_fields, validate_provider_fields,
    },
};

/// Validated, immutable provider graph that turns requests into [`Plan`]s.
///
/// A planner is read-only after construction and can be shared across
/// threads; every plan owns its own working state.
pub struct Planner<R, D> {
    pub(crate) index: IndexEntry<R, D>,
    pub(crate) registry: FieldRegistry<R, D>,
    pub(crate) options: PlannerOptions,
}

impl<R, D> Planner<R, D> {
    pub fn builder() -> PlannerBuilder<R, D> {
        PlannerBuilder::default()
    }

    /// Build a planner with default options.
    pub fn new<I>(index_provider: Arc<dyn IndexProvider<R, D>>, providers: I) -> Result<Self, PlannerError>
    where
        I: IntoIterator<Item = Arc<dyn FieldProvider<R, D>>>,
    {
        Self::builder().index_provider(index_provider).providers(providers).build()
    }

    pub fn registry(&self) -> &FieldRegistry<R, D> {
        &self.registry
    }

    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    pub fn index_provider_name(&self) -> &str {
        &self.index.name
    }
}

impl<R: Request, D> Planner<R, D> {
    /// Expand the request's fields into providers to run and fields to fetch from the index.
    pub fn new_plan(&self, request: R) -> Plan<'_, R, D> {
        let mut activation = Activation::new(&self.registry);
        for field in request.requested_fields() {
            activation.activate_field(&field);
        }
        let (providers, index_fields) = activation.finish();

        debug!(
            provider_count = providers.len(),
            index_field_count = index_fields.len(),
            "plan built"
        );
        Plan {
            planner: self,
            request,
            providers,
            index_fields,
        }
    }
}

impl<R, D> fmt::Debug for Planner<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Planner")
            .field("index", &self.index.name)
            .field("registry", &self.registry)
            .field("options", &self.options)
            .finish()
    }
}

/// Collects providers and options, then validates them into a [`Planner`].
pub struct PlannerBuilder<R, D> {
    index_provider: Option<Arc<dyn IndexProvider<R, D>>>,
    providers: Vec<Option<Arc<dyn FieldProvider<R, D>>>>,
    options: PlannerOptions,
}

impl<R, D> Default for PlannerBuilder<R, D> {
    fn default() -> Self {
        Self {
            index_provider: None,
            providers: Vec::new(),
            options: PlannerOptions::default(),
        }
    }
}

impl<R, D> PlannerBuilder<R, D> {
    pub fn index_provider(mut self, index_provider: Arc<dyn IndexProvider<R, D>>) -> Self {
        self.index_provider = Some(index_provider);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn FieldProvider<R, D>>) -> Self {
        self.providers.push(Some(provider));
        self
    }

    pub fn providers<I>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn FieldProvider<R, D>>>,
    {
        self.providers.extend(providers.into_iter().map(Some));
        self
    }

    /// Add a provider that may be absent, e.g. one a factory could not build.
    ///
    /// An empty slot fails [`build`](Self::build) with
    /// [`ValidationIssue::EmptyProviderSlot`].
    pub fn provider_slot(mut self, provider: Option<Arc<dyn FieldProvider<R, D>>>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn options(mut self, options: PlannerOptions) -> Self {
        self.options = options;
        self
    }

    /// Validate every declaration, register fields, and prove the graph acyclic.
    ///
    /// # Errors
    ///
    /// - [`PlannerError::MissingIndexProvider`] when no index provider was set
    /// - [`PlannerError::InvalidProviders`] listing every incomplete declaration
    /// - [`PlannerError::DuplicateFieldProvider`] for the first field claimed twice
    /// - [`PlannerError::CyclicDependency`] with the offending path
    pub fn build(self) -> Result<Planner<R, D>, PlannerError> {
        let index_provider = self.index_provider.ok_or(PlannerError::MissingIndexProvider)?;
        let index = IndexEntry::snapshot(index_provider);

        let mut report = ValidationReport::default();
        validate_index_fields(&index.name, &index.fields, &mut report);

        let mut seen: Vec<&Arc<dyn FieldProvider<R, D>>> = Vec::new();
        let mut entries = Vec::with_capacity(self.providers.len());
        for (position, slot) in self.providers.iter().enumerate() {
            let Some(provider) = slot else {
                report.push(ValidationIssue::EmptyProviderSlot { position });
                continue;
            };
            if seen.iter().any(|known| Arc::ptr_eq(known, provider)) {
                debug!(provider = %provider.name(), position, "provider added twice; keeping first registration");
                continue;
            }
            seen.push(provider);

            let entry = ProviderEntry::snapshot(provider.as_ref());
            validate_provider_fields(&entry.name, &entry.fields, &mut report);
            entries.push(entry);
        }

        if !report.is_empty() {
            for issue in report.issues() {
                warn!(%issue, "invalid provider declaration");
            }
            return Err(PlannerError::InvalidProviders(report));
        }

        let mut registry = FieldRegistry::new();
        for entry in entries {
            registry.register(entry)?;
        }
        check_for_cycles(&registry)?;

        info!(
            index = %index.name,
            index_field_count = index.fields.len(),
            provider_count = registry.provider_count(),
            field_count = registry.len(),
            "planner constructed"
        );
        Ok(Planner {
            index,
            registry,
            options: self.options,
        })
    }
}
