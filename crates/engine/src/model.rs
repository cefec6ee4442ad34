//! Field identifiers, field declarations, and the document payload that
//! providers enrich.

use std::{any::Any, borrow::Borrow, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::executor::ExecutionContext;

/// Prefix marking a dependency on the raw, index-supplied value of a field.
pub const INDEX_RAW_PREFIX: char = '_';

/// Name of a field produced by a provider or by the index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldName(Arc<str>);

impl FieldName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the name starts with [`INDEX_RAW_PREFIX`] and therefore cannot
    /// be declared by a provider.
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(INDEX_RAW_PREFIX)
    }
}

impl fmt::Debug for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FieldName {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

/// Reference to a field as written in a dependency list or a request.
///
/// `Bare` resolves through the registry: to the provider that owns the
/// field, or to the index when no provider does. `IndexRaw` always resolves to
/// the index, which lets a provider read the value it is about to overwrite
/// without depending on itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldRef {
    Bare(FieldName),
    IndexRaw(FieldName),
}

impl FieldRef {
    /// Parse the textual notation where `_name` means the raw index value of `name`.
    ///
    /// A lone prefix character is treated as a bare name.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(INDEX_RAW_PREFIX) {
            Some(name) if !name.is_empty() => Self::IndexRaw(FieldName::from(name)),
            _ => Self::Bare(FieldName::from(raw)),
        }
    }

    pub fn bare(name: impl Into<FieldName>) -> Self {
        Self::Bare(name.into())
    }

    pub fn index_raw(name: impl Into<FieldName>) -> Self {
        Self::IndexRaw(name.into())
    }

    /// The referenced field name with the raw-index marker removed.
    pub fn name(&self) -> &FieldName {
        match self {
            Self::Bare(name) | Self::IndexRaw(name) => name,
        }
    }

    pub fn is_index_raw(&self) -> bool {
        matches!(self, Self::IndexRaw(_))
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(name) => write!(f, "{name}"),
            Self::IndexRaw(name) => write!(f, "{INDEX_RAW_PREFIX}{name}"),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FieldRef {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FieldName> for FieldRef {
    fn from(name: FieldName) -> Self {
        Self::Bare(name)
    }
}

/// Callback filling one field of the document at the given index.
pub type FillFn<R, D> = Arc<dyn Fn(usize, &mut ExecutionContext<'_, R, D>) -> anyhow::Result<()> + Send + Sync>;

/// Callback removing one field from a document.
pub type ClearFn<D> = Arc<dyn Fn(&mut D) + Send + Sync>;

/// A field declared by a [`FieldProvider`](crate::FieldProvider).
///
/// Both callbacks are required; they are optional here only so that planner
/// construction can report every incomplete declaration at once.
pub struct Field<R, D> {
    pub name: FieldName,
    pub fill: Option<FillFn<R, D>>,
    pub clear: Option<ClearFn<D>>,
}

impl<R, D> Field<R, D> {
    /// Declare a field with both callbacks.
    pub fn new<F, C>(name: impl Into<FieldName>, fill: F, clear: C) -> Self
    where
        F: Fn(usize, &mut ExecutionContext<'_, R, D>) -> anyhow::Result<()> + Send + Sync + 'static,
        C: Fn(&mut D) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fill: Some(Arc::new(fill)),
            clear: Some(Arc::new(clear)),
        }
    }

    /// Declare a field without callbacks; attach them with [`Field::with_fill`] and [`Field::with_clear`].
    pub fn named(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            fill: None,
            clear: None,
        }
    }

    pub fn with_fill<F>(mut self, fill: F) -> Self
    where
        F: Fn(usize, &mut ExecutionContext<'_, R, D>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.fill = Some(Arc::new(fill));
        self
    }

    pub fn with_clear<C>(mut self, clear: C) -> Self
    where
        C: Fn(&mut D) + Send + Sync + 'static,
    {
        self.clear = Some(Arc::new(clear));
        self
    }
}

impl<R, D> Clone for Field<R, D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            fill: self.fill.clone(),
            clear: self.clear.clone(),
        }
    }
}

impl<R, D> fmt::Debug for Field<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("has_fill", &self.fill.is_some())
            .field("has_clear", &self.clear.is_some())
            .finish()
    }
}

/// A field populated by the index provider when it creates the document batch.
pub struct IndexField<D> {
    pub name: FieldName,
    pub clear: Option<ClearFn<D>>,
}

impl<D> IndexField<D> {
    pub fn new<C>(name: impl Into<FieldName>, clear: C) -> Self
    where
        C: Fn(&mut D) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            clear: Some(Arc::new(clear)),
        }
    }

    pub fn named(name: impl Into<FieldName>) -> Self {
        Self {
            name: name.into(),
            clear: None,
        }
    }
}

impl<D> Clone for IndexField<D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            clear: self.clear.clone(),
        }
    }
}

impl<D> fmt::Debug for IndexField<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexField")
            .field("name", &self.name)
            .field("has_clear", &self.clear.is_some())
            .finish()
    }
}

/// Document batch produced by the index and enriched by providers, plus
/// caller-defined side-channel data the engine never touches.
pub struct Payload<D> {
    pub documents: Vec<D>,
    custom_data: Option<Box<dyn Any + Send>>,
}

impl<D> Payload<D> {
    pub fn new(documents: Vec<D>) -> Self {
        Self {
            documents,
            custom_data: None,
        }
    }

    pub fn with_custom_data<T: Any + Send>(mut self, data: T) -> Self {
        self.custom_data = Some(Box::new(data));
        self
    }

    pub fn set_custom_data<T: Any + Send>(&mut self, data: T) {
        self.custom_data = Some(Box::new(data));
    }

    /// Side-channel data, if present and of type `T`.
    pub fn custom_data_ref<T: Any>(&self) -> Option<&T> {
        self.custom_data.as_ref()?.downcast_ref::<T>()
    }

    pub fn custom_data_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom_data.as_mut()?.downcast_mut::<T>()
    }

    pub fn into_documents(self) -> Vec<D> {
        self.documents
    }
}

impl<D> Default for Payload<D> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<D> fmt::Debug for Payload<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("document_count", &self.documents.len())
            .field("has_custom_data", &self.custom_data.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_recognizes_index_raw_prefix() {
        assert_eq!(FieldRef::parse("_CPF"), FieldRef::index_raw("CPF"));
        assert_eq!(FieldRef::parse("CPF"), FieldRef::bare("CPF"));
        assert_eq!(FieldRef::parse("_"), FieldRef::bare("_"));
        assert_eq!(FieldRef::parse("_CPF").name().as_str(), "CPF");
    }

    #[test]
    fn display_restores_textual_notation() {
        assert_eq!(FieldRef::index_raw("a").to_string(), "_a");
        assert_eq!(FieldRef::bare("a").to_string(), "a");
    }

    #[test]
    fn custom_data_is_typed() {
        let mut payload: Payload<()> = Payload::new(vec![(), ()]).with_custom_data(vec!["seed".to_string()]);
        payload
            .custom_data_mut::<Vec<String>>()
            .expect("custom data present")
            .push("more".into());

        assert!(payload.custom_data_ref::<u32>().is_none());
        assert_eq!(payload.custom_data_ref::<Vec<String>>().map(Vec::len), Some(2));
    }
}
