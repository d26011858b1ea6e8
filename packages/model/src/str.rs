use std::sync::Arc;

use cu::pre::*;

/// Cheaply-cloneable string used for names that get copied into many model
/// entities (namespace segments, field/method names, file paths, ...).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deref, Display, DebugCustom)]
#[display("{}", self.0)]
#[debug("{:?}", self.0)]
#[repr(transparent)]
pub struct ArcStr(Arc<str>);

impl ArcStr {
    pub fn new(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<&str> for ArcStr {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ArcStr {
    fn from(value: String) -> Self {
        Self(value.into())
    }
}

impl AsRef<str> for ArcStr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Default for ArcStr {
    fn default() -> Self {
        ArcStr::new("")
    }
}
