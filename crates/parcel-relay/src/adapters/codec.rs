//! Bincode codec backed by an explicit type registry.
//!
//! Only registered types can be relayed. Both ends of a transfer must register
//! the same type under the same tag; the tag is what travels in notifications.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::domain::{EncodedPayload, Payload};
use crate::error::CodecError;
use crate::ports::Codec;

type EncodeFn = fn(&(dyn Any + Send + Sync)) -> Result<Vec<u8>, CodecError>;
type DecodeFn = fn(&[u8]) -> Result<Payload, CodecError>;

struct Registration {
    tag: String,
    encode: EncodeFn,
    decode: DecodeFn,
}

fn encode_value<T: Serialize + Any>(
    value: &(dyn Any + Send + Sync),
) -> Result<Vec<u8>, CodecError> {
    let value = value.downcast_ref::<T>().ok_or_else(|| CodecError::UnregisteredType {
        type_name: type_name::<T>().to_string(),
    })?;
    bincode::serialize(value).map_err(|e| CodecError::Serialize(e.to_string()))
}

fn decode_value<T>(bytes: &[u8]) -> Result<Payload, CodecError>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    bincode::deserialize::<T>(bytes)
        .map(Payload::new)
        .map_err(|e| CodecError::Deserialize(e.to_string()))
}

/// `Codec` that serializes registered types with bincode.
#[derive(Clone, Default)]
pub struct BincodeCodec {
    by_type: HashMap<TypeId, Arc<Registration>>,
    by_tag: HashMap<String, Arc<Registration>>,
}

impl BincodeCodec {
    /// Empty codec; nothing can be relayed until types are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec with the common scalar and string types registered under short
    /// tags (`string`, `bool`, `i32`, `i64`, `u32`, `u64`, `f32`, `f64`,
    /// `bytes`, `strings`).
    pub fn with_primitives() -> Self {
        Self::new()
            .register_as::<String>("string")
            .register_as::<bool>("bool")
            .register_as::<i32>("i32")
            .register_as::<i64>("i64")
            .register_as::<u32>("u32")
            .register_as::<u64>("u64")
            .register_as::<f32>("f32")
            .register_as::<f64>("f64")
            .register_as::<Vec<u8>>("bytes")
            .register_as::<Vec<String>>("strings")
    }

    /// Register `T` under its Rust type name.
    pub fn with_type<T>(self) -> Self
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        self.register_as::<T>(type_name::<T>())
    }

    /// Register `T` under `tag`, replacing whatever used that tag or type before.
    pub fn register_as<T>(mut self, tag: impl Into<String>) -> Self
    where
        T: Serialize + DeserializeOwned + Any + Send + Sync,
    {
        let tag = tag.into();
        let registration = Arc::new(Registration {
            tag: tag.clone(),
            encode: encode_value::<T>,
            decode: decode_value::<T>,
        });

        self.by_type.retain(|_, r| r.tag != tag);
        if let Some(previous) = self.by_type.insert(TypeId::of::<T>(), Arc::clone(&registration)) {
            self.by_tag.remove(&previous.tag);
        }
        self.by_tag.insert(tag, registration);
        self
    }

    /// Tag `T` is registered under, if any.
    pub fn tag_of<T: Any>(&self) -> Option<&str> {
        self.by_type
            .get(&TypeId::of::<T>())
            .map(|r| r.tag.as_str())
    }

    /// Registered tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.by_tag.keys().map(String::as_str)
    }
}

impl Codec for BincodeCodec {
    fn encode(&self, payload: &Payload) -> Result<EncodedPayload, CodecError> {
        let registration =
            self.by_type
                .get(&payload.value_type_id())
                .ok_or_else(|| CodecError::UnregisteredType {
                    type_name: payload.type_name().to_string(),
                })?;

        Ok(EncodedPayload {
            bytes: (registration.encode)(payload.as_any())?,
            type_tag: registration.tag.clone(),
        })
    }

    fn resolve(&self, type_tag: &str) -> bool {
        self.by_tag.contains_key(type_tag)
    }

    fn decode(&self, type_tag: &str, bytes: &[u8]) -> Result<Payload, CodecError> {
        let registration = self.by_tag.get(type_tag).ok_or_else(|| CodecError::UnknownTag {
            tag: type_tag.to_string(),
        })?;
        (registration.decode)(bytes)
    }
}

impl fmt::Debug for BincodeCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("BincodeCodec").field("tags", &tags).finish()
    }
}
