//! WAPI object references
//!
//! A reference looks like `record:a/ZG5zLmJpbmRfYSQ...:www.example.com/default`:
//! the object type, a slash, an opaque base64 id and optionally a colon
//! followed by a human readable name (which may itself contain slashes).

use super::error::ApiError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub object_type: String,
    pub id: String,
    pub name: Option<String>,
}

impl ObjectRef {
    pub fn parse(reference: &str) -> Result<Self, ApiError> {
        let invalid = || ApiError::InvalidRef(reference.to_string());

        let (object_type, rest) = reference.split_once('/').ok_or_else(invalid)?;
        let type_ok = !object_type.is_empty()
            && object_type
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ':' || c == '_');
        if !type_ok {
            return Err(invalid());
        }

        let (id, name) = match rest.split_once(':') {
            Some((id, name)) => (id, Some(name.to_string())),
            None => (rest, None),
        };
        if id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            object_type: object_type.to_string(),
            id: id.to_string(),
            name,
        })
    }

    /// True when the reference points at an object of `object_type`
    pub fn is_type(&self, object_type: &str) -> bool {
        self.object_type == object_type
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.object_type, self.id)?;
        if let Some(name) = &self.name {
            write!(f, ":{}", name)?;
        }
        Ok(())
    }
}

/// Turn an import ID into a bare reference. Accepts a reference or a full
/// WAPI URL such as `https://gm/wapi/v2.13.6/record:a/ZG5z...:name/default`.
pub fn extract_ref(id: &str) -> Result<String, ApiError> {
    let trimmed = id.trim();
    let candidate = match trimmed.find("/wapi/v") {
        Some(pos) => {
            let after = &trimmed[pos + "/wapi/v".len()..];
            let (_, reference) = after
                .split_once('/')
                .ok_or_else(|| ApiError::InvalidRef(id.to_string()))?;
            reference.split('?').next().unwrap_or(reference)
        }
        None => trimmed,
    };

    let decoded = urlencoding::decode(candidate)
        .map_err(|_| ApiError::InvalidRef(id.to_string()))?
        .into_owned();
    ObjectRef::parse(&decoded)?;
    Ok(decoded)
}
