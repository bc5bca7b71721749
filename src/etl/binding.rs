//! Role descriptors: how a pipeline is told what to run for each stage
//!
//! A role is either an already built object ([`Role::Instance`]) or a constructor
//! ([`Role::Class`]) that builds a fresh object from per-call [`Params`].

use super::{Extractor, Loader, Transformer};
use crate::error::EtlError;
use eyre::Result;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Keyword arguments for constructors and per-call options, insertion ordered
pub type Params = serde_json::Map<String, JsonValue>;

/// Builds a role object from keyword arguments
pub type Constructor<T> = Arc<dyn Fn(&Params) -> Result<Box<T>> + Send + Sync>;

/// Deserialize the typed options of `owner` from its params
///
/// # Errors
/// Returns a configuration error naming `owner` for unknown keys, missing required keys or
/// badly typed values
pub fn parse_params<T: DeserializeOwned>(owner: &str, params: &Params) -> Result<T> {
    serde_json::from_value(JsonValue::Object(params.clone()))
        .map_err(|e| EtlError::config(format!("Bad options for {owner}: {e}")).into())
}

/// The three pipeline roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    Extractor,
    Transformer,
    Loader,
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extractor => write!(f, "Extractor"),
            Self::Transformer => write!(f, "Transformer"),
            Self::Loader => write!(f, "Loader"),
        }
    }
}

/// Role descriptor handed to [`Pipeline::new`](super::Pipeline::new)
pub enum Role<T: ?Sized> {
    /// Reused as-is for every call
    Instance(Box<T>),
    /// Built anew on every call from that call's params
    Class(Constructor<T>),
}

impl<T: ?Sized> Role<T> {
    pub fn is_instance(&self) -> bool {
        matches!(self, Self::Instance(_))
    }
}

impl<T: ?Sized> fmt::Debug for Role<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => write!(f, "Role::Instance"),
            Self::Class(_) => write!(f, "Role::Class"),
        }
    }
}

impl Role<dyn Extractor> {
    pub fn instance(extractor: impl Extractor + 'static) -> Self {
        Self::Instance(Box::new(extractor))
    }

    pub fn class<E, F>(constructor: F) -> Self
    where
        E: Extractor + 'static,
        F: Fn(&Params) -> Result<E> + Send + Sync + 'static,
    {
        Self::Class(Arc::new(move |params: &Params| {
            Ok(Box::new(constructor(params)?) as Box<dyn Extractor>)
        }))
    }
}

impl Role<dyn Transformer> {
    pub fn instance(transformer: impl Transformer + 'static) -> Self {
        Self::Instance(Box::new(transformer))
    }

    pub fn class<T, F>(constructor: F) -> Self
    where
        T: Transformer + 'static,
        F: Fn(&Params) -> Result<T> + Send + Sync + 'static,
    {
        Self::Class(Arc::new(move |params: &Params| {
            Ok(Box::new(constructor(params)?) as Box<dyn Transformer>)
        }))
    }
}

impl Role<dyn Loader> {
    pub fn instance(loader: impl Loader + 'static) -> Self {
        Self::Instance(Box::new(loader))
    }

    pub fn class<L, F>(constructor: F) -> Self
    where
        L: Loader + 'static,
        F: Fn(&Params) -> Result<L> + Send + Sync + 'static,
    {
        Self::Class(Arc::new(move |params: &Params| {
            Ok(Box::new(constructor(params)?) as Box<dyn Loader>)
        }))
    }
}

/// Transformer descriptor: a single role or an ordered list of them
#[derive(Debug)]
pub enum TransformerRoles {
    One(Role<dyn Transformer>),
    Many(Vec<Role<dyn Transformer>>),
}

impl From<Role<dyn Transformer>> for TransformerRoles {
    fn from(role: Role<dyn Transformer>) -> Self {
        Self::One(role)
    }
}

impl From<Vec<Role<dyn Transformer>>> for TransformerRoles {
    fn from(roles: Vec<Role<dyn Transformer>>) -> Self {
        Self::Many(roles)
    }
}

/// Non-fatal usage diagnostic, e.g. arguments handed to an already built role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    pub role: RoleKind,
    pub message: String,
}

impl Advisory {
    /// Advisory for params passed to a role that is already instanced, if any were passed
    pub fn extra_arguments(role: RoleKind, plural: bool, params: &Params) -> Option<Self> {
        if params.is_empty() {
            return None;
        }
        let subject = match (role, plural) {
            (RoleKind::Transformer, true) => "Instanced transformers".to_string(),
            (role, _) => format!("Instanced {}", role.to_string().to_lowercase()),
        };
        let keys = params.keys().cloned().collect::<Vec<_>>().join(", ");
        Some(Self {
            role,
            message: format!("{subject} receiving extra arguments ! ignored: {keys}"),
        })
    }

    pub fn emit(&self) {
        log::warn!("{}", self.message);
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
