//! CaptorId - name of one synchronized stream
//!
//! Backed by `Arc<str>`: ids are created once when a synchronizer is
//! assembled and then cloned into every log field, metric label and frame.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Cheap-to-clone captor identifier.
///
/// # Examples
/// ```
/// use contracts::CaptorId;
///
/// let id = CaptorId::new("imu");
/// let copy = id.clone();
/// assert_eq!(copy, "imu");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptorId(Arc<str>);

impl CaptorId {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CaptorId {
    fn default() -> Self {
        Self::new("captor")
    }
}

impl Deref for CaptorId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CaptorId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Hash/Eq of Arc<str> match str, so maps keyed by CaptorId accept &str lookups
impl Borrow<str> for CaptorId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaptorId {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CaptorId {
    #[inline]
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl PartialEq<str> for CaptorId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for CaptorId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for CaptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CaptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CaptorId({:?})", &*self.0)
    }
}

impl Serialize for CaptorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CaptorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}
