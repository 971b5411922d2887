//! JSON and YAML translation helpers.
//!
//! Parsing uses `serde_path_to_error` to surface a best-effort "path" (e.g. `[0].name[0].family`)
//! to the failing field when the text does not match the resource schema.

use crate::{FhirError, FhirResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A FHIR-aligned resource with a fixed `resourceType` and an id.
pub trait Resource: Serialize + DeserializeOwned {
    /// The `resourceType` value every instance must carry.
    const RESOURCE_TYPE: &'static str;

    fn id(&self) -> &str;

    fn resource_type(&self) -> &str;

    /// Parse a single resource from JSON, rejecting a mismatched `resourceType`.
    fn from_json(text: &str) -> FhirResult<Self> {
        let resource: Self = parse_json(text, Self::RESOURCE_TYPE)?;
        check_resource_type(&resource)?;
        Ok(resource)
    }

    /// Render as pretty-printed JSON.
    fn to_json(&self) -> FhirResult<String> {
        render_json(self)
    }

    /// Render as YAML for human-readable export.
    fn to_yaml(&self) -> FhirResult<String> {
        serde_yaml::to_string(self).map_err(|e| {
            FhirError::Translation(format!("Failed to serialise {}: {e}", Self::RESOURCE_TYPE))
        })
    }
}

/// Parse JSON text into `T`, reporting the path of the first mismatch.
///
/// `label` names the thing being parsed in error messages.
pub fn parse_json<T: DeserializeOwned>(text: &str, label: &str) -> FhirResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{label} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// Render any serialisable value as pretty-printed JSON.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> FhirResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Parse a JSON array of resources, validating each `resourceType`.
pub fn parse_resources<T: Resource>(text: &str) -> FhirResult<Vec<T>> {
    let items: Vec<T> = parse_json(text, T::RESOURCE_TYPE)?;
    for item in &items {
        check_resource_type(item)?;
    }
    Ok(items)
}

fn check_resource_type<T: Resource>(resource: &T) -> FhirResult<()> {
    if resource.resource_type() != T::RESOURCE_TYPE {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{}', got '{}'",
            T::RESOURCE_TYPE,
            resource.resource_type()
        )));
    }
    Ok(())
}

/// Serde adapter that writes non-finite numbers as `null` and reads `null` back as NaN.
///
/// JSON has no NaN literal; observations whose value failed to parse keep NaN in memory.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
