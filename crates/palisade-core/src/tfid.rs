//! Opaque resource identity carried in orchestrator state.
//!
//! A tfid is base64-wrapped JSON of `{name | names, location}` — enough
//! to recover an object's placement and identity without re-reading the
//! plan, and the sole input accepted when importing a resource. The
//! encoded form is ASCII and round-trip stable; the JSON layer reuses
//! the [`Location`](crate::location::Location) wire shape, which is
//! frozen.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::location::{Location, LocationError};

/// Errors from tfid encoding and decoding.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TfidError {
    /// The input is not base64 in any accepted alphabet.
    #[error("unparseable resource id: not base64")]
    NotBase64,

    /// The decoded payload is not the expected JSON document.
    #[error("unparseable resource id: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded identity fails validation.
    #[error("invalid resource id: {0}")]
    Invalid(String),

    /// The decoded location fails validation.
    #[error("invalid resource id: {0}")]
    Location(#[from] LocationError),
}

/// The identity of a managed resource: one name (singleton resources) or
/// an ordered name list (grouping resources), plus the location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentity {
    /// Entry name for singleton resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ordered entry names for grouping resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,

    /// Where the object lives on the device.
    pub location: Location,
}

impl ResourceIdentity {
    /// Identity of a single named entry.
    #[must_use]
    pub fn singleton(name: impl Into<String>, location: Location) -> Self {
        Self {
            name: Some(name.into()),
            names: None,
            location,
        }
    }

    /// Identity of an ordered group of entries.
    #[must_use]
    pub fn group(names: Vec<String>, location: Location) -> Self {
        Self {
            name: None,
            names: Some(names),
            location,
        }
    }

    /// Checks the identity invariants.
    ///
    /// Exactly one of `name`/`names` must be set; a name must be
    /// non-empty; a name list must be non-empty and pairwise distinct;
    /// the location must be valid.
    ///
    /// # Errors
    ///
    /// Returns [`TfidError::Invalid`] or [`TfidError::Location`].
    pub fn validate(&self) -> Result<(), TfidError> {
        match (&self.name, &self.names) {
            (Some(_), Some(_)) => {
                return Err(TfidError::Invalid(
                    "both 'name' and 'names' are set".to_string(),
                ));
            }
            (None, None) => {
                return Err(TfidError::Invalid(
                    "neither 'name' nor 'names' is set".to_string(),
                ));
            }
            (Some(name), None) => {
                if name.is_empty() {
                    return Err(TfidError::Invalid("'name' is empty".to_string()));
                }
            }
            (None, Some(names)) => {
                if names.is_empty() {
                    return Err(TfidError::Invalid("'names' is empty".to_string()));
                }
                for (i, name) in names.iter().enumerate() {
                    if name.is_empty() {
                        return Err(TfidError::Invalid(format!("'names[{i}]' is empty")));
                    }
                    if names[..i].contains(name) {
                        return Err(TfidError::Invalid(format!("duplicate name '{name}'")));
                    }
                }
            }
        }
        self.location.validate()?;
        Ok(())
    }
}

/// Encodes an identity into its opaque string form.
///
/// The output is base64url over compact JSON, ASCII-only and safe to
/// embed in orchestrator state.
///
/// # Errors
///
/// Returns [`TfidError::Invalid`] family errors when the identity fails
/// [`ResourceIdentity::validate`].
pub fn encode(identity: &ResourceIdentity) -> Result<String, TfidError> {
    identity.validate()?;
    let json = serde_json::to_vec(identity)?;
    Ok(URL_SAFE.encode(json))
}

/// Decodes an opaque string back into an identity.
///
/// Accepts the url-safe alphabet (what [`encode`] produces) and the
/// standard alphabet (what state written by predecessor tooling holds),
/// padded or unpadded. The decoded identity is validated before it is
/// returned.
///
/// # Errors
///
/// Returns [`TfidError::NotBase64`], [`TfidError::Json`], or a
/// validation error.
pub fn decode(input: &str) -> Result<ResourceIdentity, TfidError> {
    let input = input.trim();
    let bytes = URL_SAFE
        .decode(input)
        .or_else(|_| URL_SAFE_NO_PAD.decode(input))
        .or_else(|_| STANDARD.decode(input))
        .map_err(|_| TfidError::NotBase64)?;
    let identity: ResourceIdentity = serde_json::from_slice(&bytes)?;
    identity.validate()?;
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::location::{VsysLocation, DEFAULT_DEVICE, DEFAULT_VSYS};

    fn vsys1() -> Location {
        Location::Vsys(VsysLocation {
            ngfw_device: DEFAULT_DEVICE.to_string(),
            vsys: DEFAULT_VSYS.to_string(),
        })
    }

    #[test]
    fn test_singleton_round_trip() {
        let identity = ResourceIdentity::singleton("addr-1", vsys1());
        let encoded = encode(&identity).expect("encode");
        assert!(encoded.is_ascii());
        assert_eq!(decode(&encoded).expect("decode"), identity);
    }

    #[test]
    fn test_encoded_payload_shape() {
        let identity = ResourceIdentity::singleton("addr-1", vsys1());
        let encoded = encode(&identity).expect("encode");
        let json = URL_SAFE.decode(encoded).expect("base64");
        assert_eq!(
            String::from_utf8(json).expect("utf8"),
            r#"{"name":"addr-1","location":{"vsys":{"ngfw_device":"localhost.localdomain","vsys":"vsys1"}}}"#
        );
    }

    #[test]
    fn test_decode_accepts_standard_alphabet() {
        let identity = ResourceIdentity::group(
            vec!["rule-1".to_string(), "rule-2".to_string()],
            vsys1(),
        );
        let standard = STANDARD.encode(serde_json::to_vec(&identity).expect("json"));
        assert_eq!(decode(&standard).expect("decode"), identity);
    }

    #[test]
    fn test_decode_rejects_corruption() {
        assert!(matches!(decode("!!! not base64 !!!"), Err(TfidError::NotBase64)));
        let not_json = URL_SAFE.encode(b"definitely not json");
        assert!(matches!(decode(&not_json), Err(TfidError::Json(_))));
    }

    #[test]
    fn test_validate_rejects_empty_and_duplicate_names() {
        let empty = ResourceIdentity::singleton("", vsys1());
        assert!(encode(&empty).is_err());

        let dupes = ResourceIdentity::group(
            vec!["a".to_string(), "b".to_string(), "a".to_string()],
            vsys1(),
        );
        assert!(matches!(encode(&dupes), Err(TfidError::Invalid(_))));

        let none = ResourceIdentity {
            name: None,
            names: None,
            location: vsys1(),
        };
        assert!(none.validate().is_err());
    }

    #[test]
    fn test_decode_validates_location() {
        let identity = ResourceIdentity {
            name: Some("addr-1".to_string()),
            names: None,
            location: Location::Vsys(VsysLocation {
                ngfw_device: String::new(),
                vsys: DEFAULT_VSYS.to_string(),
            }),
        };
        let raw = URL_SAFE.encode(serde_json::to_vec(&identity).expect("json"));
        assert!(matches!(decode(&raw), Err(TfidError::Location(_))));
    }

    proptest! {
        #[test]
        fn prop_round_trip_arbitrary_names(name in "[A-Za-z0-9._-]{1,63}") {
            let identity = ResourceIdentity::singleton(name, vsys1());
            let encoded = encode(&identity).expect("encode");
            prop_assert_eq!(decode(&encoded).expect("decode"), identity);
        }

        #[test]
        fn prop_decode_never_panics(input in ".{0,128}") {
            let _ = decode(&input);
        }
    }
}
