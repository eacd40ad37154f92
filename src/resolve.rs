//! Deserialization that cannot mint a second instance.
//!
//! `&LazySingletonRegistry<T, F>` is a [`DeserializeSeed`]: it decodes a `T`
//! and hands back the shared `Arc<T>` instead, so a serialized copy read back
//! from disk or the wire never becomes a distinct live instance.
//!
//! ```
//! use lazy_singleton::{BoxError, LazySingletonRegistry};
//! use serde::de::DeserializeSeed;
//! use std::sync::Arc;
//!
//! let registry = LazySingletonRegistry::new(|| Ok::<_, BoxError>(7u32));
//! let shared = registry.get_instance().unwrap();
//!
//! let de = serde::de::value::U32Deserializer::<serde::de::value::Error>::new(99);
//! let decoded = (&registry).deserialize(de).unwrap();
//! assert!(Arc::ptr_eq(&shared, &decoded));
//! ```

use std::sync::Arc;

use serde::de::{Deserialize, DeserializeSeed, Deserializer, Error as _};

use crate::{BoxError, LazySingletonRegistry};

impl<'de, T, F> DeserializeSeed<'de> for &LazySingletonRegistry<T, F>
where
    T: Deserialize<'de>,
    F: Fn() -> Result<T, BoxError>,
{
    type Value = Arc<T>;

    fn deserialize<D>(self, deserializer: D) -> Result<Arc<T>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let decoded = T::deserialize(deserializer)?;
        self.resolve(decoded).map_err(D::Error::custom)
    }
}
