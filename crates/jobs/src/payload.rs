//! Opaque JSON payloads carried through the gateway untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use taskgate_core::DomainError;

/// Worker arguments of a job, exactly as the client sent them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Box<RawValue>);

/// Job options (retries, timeout, priority...), interpreted by the broker only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobOptions(Box<RawValue>);

macro_rules! impl_raw_json_newtype {
    ($t:ident, $name:literal) => {
        impl $t {
            /// Wrap a JSON document without re-encoding it.
            pub fn from_json(raw: impl Into<String>) -> Result<Self, DomainError> {
                RawValue::from_string(raw.into())
                    .map(Self)
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))
            }

            /// Encode a serializable value.
            pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self, DomainError> {
                serde_json::value::to_raw_value(value)
                    .map(Self)
                    .map_err(|e| DomainError::validation(format!("{}: {}", $name, e)))
            }

            /// Raw JSON text.
            pub fn as_str(&self) -> &str {
                self.0.get()
            }

            /// Decode into a concrete type (worker side).
            pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
                serde_json::from_str(self.0.get())
            }
        }

        // Byte equality: two payloads are equal only if their encodings are.
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                self.as_str() == other.as_str()
            }
        }

        impl Eq for $t {}
    };
}

impl_raw_json_newtype!(Message, "Message");
impl_raw_json_newtype!(JobOptions, "JobOptions");
