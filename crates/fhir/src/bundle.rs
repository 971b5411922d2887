//! Collection bundle: one patient with its encounters and observations, for export.

use crate::encounter::EncounterRecord;
use crate::observation::ObservationRecord;
use crate::patient::PatientRecord;
use crate::wire::{parse_json, render_json, Resource};
use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};

/// `resourceType` of every bundle.
pub const BUNDLE_RESOURCE_TYPE: &str = "Bundle";

/// Bundle `type` for an unordered set of resources.
pub const BUNDLE_TYPE_COLLECTION: &str = "collection";

/// A resource carried in a bundle entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleResource {
    Patient(PatientRecord),
    Encounter(EncounterRecord),
    Observation(ObservationRecord),
}

impl BundleResource {
    pub fn resource_type(&self) -> &str {
        match self {
            BundleResource::Patient(p) => p.resource_type(),
            BundleResource::Encounter(e) => e.resource_type(),
            BundleResource::Observation(o) => o.resource_type(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            BundleResource::Patient(p) => p.id(),
            BundleResource::Encounter(e) => e.id(),
            BundleResource::Observation(o) => o.id(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleEntry {
    pub resource: BundleResource,
}

/// A FHIR `Bundle` of type `collection`.
///
/// Entries are the patient first, then its encounters, then its observations, each in
/// store order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(rename = "type")]
    pub bundle_type: String,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

impl Bundle {
    pub fn collection(
        patient: PatientRecord,
        encounters: impl IntoIterator<Item = EncounterRecord>,
        observations: impl IntoIterator<Item = ObservationRecord>,
    ) -> Self {
        let entry = std::iter::once(BundleResource::Patient(patient))
            .chain(encounters.into_iter().map(BundleResource::Encounter))
            .chain(observations.into_iter().map(BundleResource::Observation))
            .map(|resource| BundleEntry { resource })
            .collect();
        Self {
            resource_type: BUNDLE_RESOURCE_TYPE.to_string(),
            bundle_type: BUNDLE_TYPE_COLLECTION.to_string(),
            entry,
        }
    }

    /// The bundled patient, if the first entry is one.
    pub fn patient(&self) -> Option<&PatientRecord> {
        match self.entry.first().map(|e| &e.resource) {
            Some(BundleResource::Patient(p)) => Some(p),
            _ => None,
        }
    }

    pub fn from_json(text: &str) -> FhirResult<Self> {
        let bundle: Self = parse_json(text, BUNDLE_RESOURCE_TYPE)?;
        if bundle.resource_type != BUNDLE_RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType '{}', got '{}'",
                BUNDLE_RESOURCE_TYPE, bundle.resource_type
            )));
        }
        Ok(bundle)
    }

    pub fn to_json(&self) -> FhirResult<String> {
        render_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Coding, HumanName, Meta, Reference, TextValue};
    use crate::encounter::EncounterStatus;
    use crate::patient::Gender;
    use chrono::{TimeZone, Utc};

    fn patient() -> PatientRecord {
        PatientRecord {
            resource_type: "Patient".into(),
            id: "p-1234".into(),
            active: true,
            name: vec![HumanName {
                use_type: None,
                family: "Doe".into(),
                given: vec!["Jane".into()],
            }],
            telecom: vec![],
            gender: Gender::Female,
            birth_date: "1990-05-01".into(),
            identifier: vec![],
            extension: vec![],
            meta: Meta::first(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
        }
    }

    fn encounter() -> EncounterRecord {
        EncounterRecord {
            resource_type: "Encounter".into(),
            id: "e-1".into(),
            status: EncounterStatus::Arrived,
            class: Coding {
                system: "actCode".into(),
                code: "EMER".into(),
                display: "Emergency".into(),
            },
            subject: Reference::patient("p-1234"),
            period: None,
            reason_code: vec![TextValue {
                text: "Fever".into(),
            }],
        }
    }

    #[test]
    fn collection_lists_patient_first() {
        let bundle = Bundle::collection(patient(), vec![encounter()], vec![]);
        assert_eq!(bundle.bundle_type, "collection");
        assert_eq!(bundle.entry.len(), 2);
        assert_eq!(bundle.patient().map(|p| p.id.as_str()), Some("p-1234"));
        assert_eq!(bundle.entry[1].resource.resource_type(), "Encounter");
        assert_eq!(bundle.entry[1].resource.id(), "e-1");
    }

    #[test]
    fn json_uses_fhir_bundle_keys() {
        let bundle = Bundle::collection(patient(), vec![encounter()], vec![]);
        let json = bundle.to_json().unwrap();
        assert!(json.contains(r#""resourceType": "Bundle""#));
        assert!(json.contains(r#""type": "collection""#));
        assert!(json.contains(r#""resourceType": "Encounter""#));

        let reparsed = Bundle::from_json(&json).unwrap();
        assert_eq!(reparsed, bundle);
        assert!(matches!(reparsed.entry[1].resource, BundleResource::Encounter(_)));
    }

    #[test]
    fn rejects_other_resource_types() {
        let err = Bundle::from_json(r#"{"resourceType":"Patient","type":"collection","entry":[]}"#)
            .unwrap_err();
        assert!(matches!(err, FhirError::InvalidInput(msg) if msg.contains("Patient")));
    }
}
