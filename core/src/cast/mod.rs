//! Cast pipeline: per-attribute, per-backend value conversion.
//!
//! Each attribute of an entity may declare a cast kind (such as
//! [`date`](self::date)). A kind is a [`Caster`]: two independent tables of
//! conversion functions keyed by [`Backend`], one for values going into
//! storage and one for values coming out of it.
//!
//! ```
//! use chrono::NaiveDate;
//! use trellis_core::cast::{CastManager, CastPipeline};
//! use trellis_core::Value;
//! use trellis_types::Backend;
//!
//! let casts = CastManager::builder().attribute("born_on", "date").build()?;
//! let born = NaiveDate::from_ymd_opt(1990, 5, 17).unwrap().and_hms_opt(13, 45, 0).unwrap();
//!
//! assert_eq!(
//!     casts.cast_in("born_on", Value::from(born), Backend::Sql)?,
//!     Value::from("1990-05-17"),
//! );
//! # Ok::<(), trellis_core::TrellisError>(())
//! ```

pub mod date;

use std::sync::Arc;

use hashbrown::HashMap;
use trellis_types::Backend;

use crate::error::{Result, TrellisError};
use crate::value::{Attributes, Value};

/// A single conversion step for one backend and one direction.
pub type CastFn = fn(Value) -> Result<Value>;

/// Converts attribute values between their domain and storage forms.
pub trait CastPipeline {
    /// Domain value → storage value for `backend`.
    fn cast_in(&self, attribute: &str, value: Value, backend: Backend) -> Result<Value>;

    /// Storage value from `backend` → domain value.
    fn cast_out(&self, attribute: &str, value: Value, backend: Backend) -> Result<Value>;

    /// Casts every attribute of a write.
    fn cast_attributes_in(&self, attributes: Attributes, backend: Backend) -> Result<Attributes> {
        attributes
            .into_iter()
            .map(|(name, value)| {
                let value = self.cast_in(&name, value, backend)?;
                Ok((name, value))
            })
            .collect()
    }

    /// Casts every attribute of a fetched row.
    fn cast_attributes_out(&self, attributes: Attributes, backend: Backend) -> Result<Attributes> {
        attributes
            .into_iter()
            .map(|(name, value)| {
                let value = self.cast_out(&name, value, backend)?;
                Ok((name, value))
            })
            .collect()
    }
}

/// The pipeline that leaves every value as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCast;

impl CastPipeline for NoCast {
    #[inline]
    fn cast_in(&self, _attribute: &str, value: Value, _backend: Backend) -> Result<Value> {
        Ok(value)
    }

    #[inline]
    fn cast_out(&self, _attribute: &str, value: Value, _backend: Backend) -> Result<Value> {
        Ok(value)
    }
}

//------------------------------------------------------------------------------
// Caster
//------------------------------------------------------------------------------

/// One cast kind with its per-backend conversion tables.
#[derive(Debug, Clone)]
pub struct Caster {
    kind: String,
    cast_in: HashMap<Backend, CastFn>,
    cast_out: HashMap<Backend, CastFn>,
}

impl Caster {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            cast_in: HashMap::new(),
            cast_out: HashMap::new(),
        }
    }

    /// Registers the storage-bound conversion for `backend`.
    #[must_use]
    pub fn cast_in_with(mut self, backend: Backend, convert: CastFn) -> Self {
        self.cast_in.insert(backend, convert);
        self
    }

    /// Registers the domain-bound conversion for `backend`.
    #[must_use]
    pub fn cast_out_with(mut self, backend: Backend, convert: CastFn) -> Self {
        self.cast_out.insert(backend, convert);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn cast_in(&self, backend: Backend, value: Value) -> Result<Value> {
        self.apply(&self.cast_in, backend, value)
    }

    pub fn cast_out(&self, backend: Backend, value: Value) -> Result<Value> {
        self.apply(&self.cast_out, backend, value)
    }

    fn apply(
        &self,
        table: &HashMap<Backend, CastFn>,
        backend: Backend,
        value: Value,
    ) -> Result<Value> {
        let convert = table
            .get(&backend)
            .ok_or_else(|| TrellisError::CastConfiguration {
                kind: self.kind.clone(),
                backend,
            })?;

        if value.is_empty() {
            return Ok(value);
        }

        convert(value)
    }
}

//------------------------------------------------------------------------------
// CastManager
//------------------------------------------------------------------------------

/// Attribute → cast kind mapping of one entity type.
///
/// Built once through [`CastManager::builder`]; attributes without a declared
/// kind pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct CastManager {
    attributes: HashMap<String, Arc<Caster>>,
}

impl CastManager {
    /// Starts a builder with the built-in kinds (`date`) registered.
    pub fn builder() -> CastManagerBuilder {
        CastManagerBuilder::new()
    }

    /// The caster declared for `attribute`, if any.
    pub fn caster(&self, attribute: &str) -> Option<&Caster> {
        self.attributes.get(attribute).map(Arc::as_ref)
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl CastPipeline for CastManager {
    fn cast_in(&self, attribute: &str, value: Value, backend: Backend) -> Result<Value> {
        match self.caster(attribute) {
            Some(caster) => caster.cast_in(backend, value),
            None => Ok(value),
        }
    }

    fn cast_out(&self, attribute: &str, value: Value, backend: Backend) -> Result<Value> {
        match self.caster(attribute) {
            Some(caster) => caster.cast_out(backend, value),
            None => Ok(value),
        }
    }
}

/// Collects cast kinds and attribute declarations, then validates them.
#[derive(Debug, Clone)]
pub struct CastManagerBuilder {
    kinds: HashMap<String, Arc<Caster>>,
    declarations: Vec<(String, String)>,
}

impl CastManagerBuilder {
    pub fn new() -> Self {
        Self {
            kinds: HashMap::new(),
            declarations: Vec::new(),
        }
        .kind(date::caster())
    }

    /// Registers (or replaces) a cast kind.
    #[must_use]
    pub fn kind(mut self, caster: Caster) -> Self {
        self.kinds.insert(caster.kind().to_owned(), Arc::new(caster));
        self
    }

    /// Declares that `attribute` is cast with `kind`.
    #[must_use]
    pub fn attribute(mut self, attribute: impl Into<String>, kind: impl Into<String>) -> Self {
        self.declarations.push((attribute.into(), kind.into()));
        self
    }

    /// Resolves every declaration; an unknown kind fails here rather than at
    /// the first cast.
    pub fn build(self) -> Result<CastManager> {
        let mut attributes = HashMap::with_capacity(self.declarations.len());
        for (attribute, kind) in self.declarations {
            let caster = self
                .kinds
                .get(&kind)
                .cloned()
                .ok_or_else(|| TrellisError::UnknownCastKind {
                    attribute: attribute.clone(),
                    kind,
                })?;
            attributes.insert(attribute, caster);
        }
        Ok(CastManager { attributes })
    }
}

impl Default for CastManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
