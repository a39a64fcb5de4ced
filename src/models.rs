//! Data models.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::CrewdeskError;
use serde_helpers::*;

/// Opaque record identifier.
///
/// Assigned by the store on creation and stable for the lifetime of the
/// record. Callers must not rely on any internal structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl TryFrom<&str> for RecordId {
    type Error = CrewdeskError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err(CrewdeskError::InvalidRecordId(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

impl RecordId {
    /// Mint a fresh identifier. Store backends call this on create.
    pub(crate) fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the raw identifier value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Crew application status.
///
/// One canonical vocabulary covering both review surfaces. The screening
/// desk moves an application through `Pending`/`Passed`/`Failed`/`OnHold`;
/// the placement desk uses `Pending`/`Approved`/`Disapproved`/`Proposed`/
/// `Assigned`/`Fooled`. The two subsets share only `Pending` and imply no
/// equivalence beyond that (`Passed` is not `Approved`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CrewStatus {
    /// Freshly submitted, not yet reviewed. Present in both vocabularies.
    #[default]
    Pending,
    Passed,
    Failed,
    OnHold,
    Approved,
    Disapproved,
    Proposed,
    Assigned,
    /// Legacy placement value still present in stored records; carried
    /// verbatim rather than guessed at.
    Fooled,
}

impl CrewStatus {
    /// Every status in canonical order. Aggregations use this to seed
    /// zero counts.
    pub const ALL: [CrewStatus; 9] = [
        CrewStatus::Pending,
        CrewStatus::Passed,
        CrewStatus::Failed,
        CrewStatus::OnHold,
        CrewStatus::Approved,
        CrewStatus::Disapproved,
        CrewStatus::Proposed,
        CrewStatus::Assigned,
        CrewStatus::Fooled,
    ];

    /// Subset exposed on the screening desk.
    pub const SCREENING: [CrewStatus; 4] = [
        CrewStatus::Pending,
        CrewStatus::Passed,
        CrewStatus::Failed,
        CrewStatus::OnHold,
    ];

    /// Subset exposed on the placement desk.
    pub const PLACEMENT: [CrewStatus; 6] = [
        CrewStatus::Pending,
        CrewStatus::Approved,
        CrewStatus::Disapproved,
        CrewStatus::Proposed,
        CrewStatus::Assigned,
        CrewStatus::Fooled,
    ];

    /// Kebab-case wire label, matching the serde representation.
    pub fn label(&self) -> &'static str {
        match self {
            CrewStatus::Pending => "pending",
            CrewStatus::Passed => "passed",
            CrewStatus::Failed => "failed",
            CrewStatus::OnHold => "on-hold",
            CrewStatus::Approved => "approved",
            CrewStatus::Disapproved => "disapproved",
            CrewStatus::Proposed => "proposed",
            CrewStatus::Assigned => "assigned",
            CrewStatus::Fooled => "fooled",
        }
    }

    /// Parse a wire label back into a status.
    pub fn parse(value: &str) -> Result<Self, CrewdeskError> {
        CrewStatus::ALL
            .iter()
            .find(|status| status.label() == value.trim())
            .copied()
            .ok_or_else(|| CrewdeskError::UnknownStatus(value.to_string()))
    }
}

impl fmt::Display for CrewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A document held by a crew member: passport, seaman's book, STCW
/// certificate and the like.
///
/// Expiry classification is never stored; it is computed per read from
/// `expiry_date` (see [`crate::derive::document_status`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CrewDocument {
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub place_issued: Option<String>,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub date_issued: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub expiry_date: Option<NaiveDate>,
}

/// One entry in a crew member's sea-service history.
///
/// Entries are stored in no particular order; the current or latest vessel
/// is always derived (see [`crate::derive::latest_sea_service`]). An open
/// posting has no `signed_off` date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SeaServiceEntry {
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub vessel_name: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub vessel_type: String,
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub principal: String,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub signed_on: Option<NaiveDate>,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub signed_off: Option<NaiveDate>,
}

/// A crew application record, the unit the whole pipeline operates on.
///
/// Only `id` must be present on the wire; every other field falls back to
/// its schema default when absent. Derived values (age, days onboard,
/// document status, latest vessel) are never stored on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewRecord {
    pub id: RecordId,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub full_name: String,
    #[serde(default, deserialize_with = "deserialize_trimmed_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_trimmed_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub rank: String,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default)]
    pub status: CrewStatus,
    /// Submission instant. Stored records carry several historical
    /// encodings (epoch number, `{seconds, nanoseconds}` object, ISO
    /// string); all are normalized here and unparseable values degrade to
    /// `None`.
    #[serde(
        default,
        alias = "createdAt",
        alias = "dateApplied",
        deserialize_with = "deserialize_flexible_instant"
    )]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub documents: Vec<CrewDocument>,
    #[serde(default, alias = "vesselExperience")]
    pub sea_service: Vec<SeaServiceEntry>,
}

impl CrewRecord {
    /// Open a sea-service entry for a new posting.
    pub(crate) fn open_sea_service(
        &mut self,
        vessel_name: &str,
        vessel_type: &str,
        principal: &str,
        signed_on: NaiveDate,
    ) {
        self.sea_service.push(SeaServiceEntry {
            vessel_name: vessel_name.to_string(),
            vessel_type: vessel_type.to_string(),
            principal: principal.to_string(),
            signed_on: Some(signed_on),
            signed_off: None,
        });
    }

    /// Close the open sea-service entry belonging to an ended posting.
    ///
    /// Matches on vessel name and sign-on date; anything already signed
    /// off is left alone.
    pub(crate) fn close_sea_service(
        &mut self,
        vessel_name: &str,
        signed_on: Option<NaiveDate>,
        signed_off: NaiveDate,
    ) {
        if let Some(entry) = self.sea_service.iter_mut().find(|entry| {
            entry.vessel_name == vessel_name
                && entry.signed_on == signed_on
                && entry.signed_off.is_none()
        }) {
            entry.signed_off = Some(signed_off);
        }
    }
}

/// A crew-to-vessel posting.
///
/// Written by the store's `assign` operation together with the matching
/// sea-service entry on the crew record, and removed on `unassign`. The
/// assignment is authoritative for the current posting; the record's
/// sea-service list keeps the career history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselAssignment {
    pub id: RecordId,
    pub crew_id: RecordId,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub crew_name: String,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub vessel_name: String,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub vessel_type: String,
    #[serde(default, deserialize_with = "deserialize_trimmed")]
    pub principal: String,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub signed_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_flexible_date")]
    pub signed_off: Option<NaiveDate>,
}

/// Payload for submitting a new application. The store assigns the id,
/// stamps the submission instant and starts the record in `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewApplication {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rank: String,
    pub date_of_birth: Option<NaiveDate>,
    pub documents: Vec<CrewDocument>,
    pub sea_service: Vec<SeaServiceEntry>,
}

impl NewApplication {
    pub(crate) fn into_record(self, id: RecordId, applied_at: DateTime<Utc>) -> CrewRecord {
        CrewRecord {
            id,
            full_name: self.full_name,
            email: self.email,
            phone: self.phone,
            rank: self.rank,
            date_of_birth: self.date_of_birth,
            status: CrewStatus::Pending,
            applied_at: Some(applied_at),
            documents: self.documents,
            sea_service: self.sea_service,
        }
    }
}

/// Payload for posting a crew member to a vessel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssignment {
    pub crew_id: RecordId,
    pub vessel_name: String,
    pub vessel_type: String,
    pub principal: String,
    pub signed_on: NaiveDate,
}

/// Custom deserializers
mod serde_helpers {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{self, Deserialize, Deserializer};
    use serde_json::Value;

    /// Epoch numbers at or above this magnitude are taken as milliseconds.
    const EPOCH_MILLIS_CUTOFF: i64 = 100_000_000_000;

    pub fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|v| v.trim().to_string()).unwrap_or_default())
    }

    pub fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
    }

    /// Accept the timestamp encodings observed in stored records: integer
    /// epoch seconds or milliseconds, float epoch seconds, a
    /// `{seconds, nanoseconds}` object, an RFC 3339 string, or a bare
    /// `YYYY-MM-DD` date. Anything else degrades to `None`.
    pub fn deserialize_flexible_instant<'de, D>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(instant_from_value))
    }

    /// Civil dates arrive as `YYYY-MM-DD`, as a full instant in any of the
    /// encodings above, or not at all. Unparseable values degrade to
    /// `None`.
    pub fn deserialize_flexible_date<'de, D>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(date_from_value))
    }

    pub(crate) fn instant_from_value(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Number(number) => {
                if let Some(epoch) = number.as_i64() {
                    instant_from_epoch(epoch)
                } else {
                    number
                        .as_f64()
                        .and_then(|seconds| DateTime::from_timestamp_millis((seconds * 1000.0) as i64))
                }
            }
            Value::String(text) => instant_from_str(text),
            Value::Object(map) => {
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                DateTime::from_timestamp(seconds, u32::try_from(nanos).unwrap_or(0))
            }
            _ => None,
        }
    }

    pub(crate) fn date_from_value(value: &Value) -> Option<NaiveDate> {
        match value {
            Value::String(text) => {
                let text = text.trim();
                if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    return Some(date);
                }
                instant_from_str(text).map(|instant| instant.date_naive())
            }
            Value::Number(_) | Value::Object(_) => {
                instant_from_value(value).map(|instant| instant.date_naive())
            }
            _ => None,
        }
    }

    fn instant_from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
        if epoch.abs() >= EPOCH_MILLIS_CUTOFF {
            DateTime::from_timestamp_millis(epoch)
        } else {
            DateTime::from_timestamp(epoch, 0)
        }
    }

    fn instant_from_str(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
            return Some(instant.with_timezone(&Utc));
        }
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
        date.and_hms_opt(0, 0, 0)
            .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_full_record() {
        let s = r#"{
            "id": "a7f3c2",
            "fullName": "  Anna Cruz ",
            "email": "anna.cruz@example.com",
            "phone": "+63 912 555 0101",
            "rank": "Chief Mate",
            "dateOfBirth": "1988-03-14",
            "status": "on-hold",
            "appliedAt": "2024-01-05T08:30:00Z",
            "documents": [
                {
                    "name": "Passport",
                    "placeIssued": "Manila",
                    "dateIssued": "2019-06-01",
                    "expiryDate": "2029-06-01"
                }
            ],
            "vesselExperience": [
                {
                    "vesselName": "MV Northern Star",
                    "vesselType": "Bulk Carrier",
                    "principal": "Aurora Shipping",
                    "signedOn": "2022-01-01",
                    "signedOff": "2022-09-15"
                }
            ]
        }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();

        assert_eq!(record.id, RecordId::try_from("a7f3c2").unwrap());
        assert_eq!(record.full_name, "Anna Cruz");
        assert_eq!(record.email.as_deref(), Some("anna.cruz@example.com"));
        assert_eq!(record.rank, "Chief Mate");
        assert_eq!(record.status, CrewStatus::OnHold);
        assert_eq!(
            record.applied_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 8, 30, 0).unwrap())
        );
        assert_eq!(record.documents.len(), 1);
        assert_eq!(
            record.documents[0].expiry_date,
            NaiveDate::from_ymd_opt(2029, 6, 1)
        );
        assert_eq!(record.sea_service.len(), 1);
        assert_eq!(record.sea_service[0].vessel_name, "MV Northern Star");
    }

    #[test]
    fn parse_sparse_record_defaults() {
        let s = r#"{ "id": "b4", "unknownField": 7 }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();

        assert_eq!(record.full_name, "");
        assert_eq!(record.email, None);
        assert_eq!(record.status, CrewStatus::Pending);
        assert_eq!(record.applied_at, None);
        assert!(record.documents.is_empty());
        assert!(record.sea_service.is_empty());
    }

    #[test]
    fn parse_epoch_seconds_applied_at() {
        let s = r#"{ "id": "c1", "createdAt": 1704441600 }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn parse_epoch_millis_applied_at() {
        let s = r#"{ "id": "c2", "createdAt": 1704441600000 }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap())
        );
    }

    #[test]
    fn parse_float_epoch_applied_at() {
        let s = r#"{ "id": "c8", "createdAt": 1704441600.5 }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at.map(|t| t.timestamp_millis()),
            Some(1704441600500)
        );
    }

    #[test]
    fn parse_timestamp_object_applied_at() {
        let s = r#"{ "id": "c3", "appliedAt": { "seconds": 1704441600, "nanoseconds": 0 } }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap())
        );

        let s = r#"{ "id": "c4", "appliedAt": { "_seconds": 1704441600, "_nanoseconds": 500 } }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at.map(|t| t.timestamp()),
            Some(1704441600)
        );
    }

    #[test]
    fn parse_bare_date_applied_at() {
        let s = r#"{ "id": "c5", "dateApplied": "2024-01-05" }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(
            record.applied_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_applied_at_degrades_to_none() {
        let s = r#"{ "id": "c6", "appliedAt": "last Tuesday" }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(record.applied_at, None);

        let s = r#"{ "id": "c7", "appliedAt": [2024, 1, 5] }"#;
        let record: CrewRecord = serde_json::from_str(s).unwrap();
        assert_eq!(record.applied_at, None);
    }

    #[test]
    fn status_labels_round_trip() {
        for status in CrewStatus::ALL {
            assert_eq!(CrewStatus::parse(status.label()).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("{:?}", status.label()));
        }
        assert_eq!(CrewStatus::OnHold.label(), "on-hold");
        assert!(CrewStatus::parse("retired").is_err());
    }

    #[test]
    fn status_vocabularies_cover_all() {
        let mut seen: Vec<CrewStatus> = CrewStatus::SCREENING.to_vec();
        seen.extend(CrewStatus::PLACEMENT);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), CrewStatus::ALL.len());

        let shared: Vec<CrewStatus> = CrewStatus::SCREENING
            .iter()
            .filter(|status| CrewStatus::PLACEMENT.contains(status))
            .copied()
            .collect();
        assert_eq!(shared, vec![CrewStatus::Pending]);
    }

    #[test]
    fn record_id_rejects_blank() {
        assert!(RecordId::try_from("").is_err());
        assert!(RecordId::try_from("   ").is_err());
        assert!(RecordId::try_from("a1").is_ok());
    }

    #[test]
    fn new_application_starts_pending() {
        let application = NewApplication {
            full_name: "Juan Ann".to_string(),
            rank: "Oiler".to_string(),
            ..NewApplication::default()
        };
        let stamped = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let record = application.into_record(RecordId::generate(), stamped);

        assert_eq!(record.status, CrewStatus::Pending);
        assert_eq!(record.applied_at, Some(stamped));
        assert!(!record.id.as_str().is_empty());
    }

    #[test]
    fn serialized_record_round_trips() {
        let record = CrewRecord {
            id: RecordId::try_from("r9").unwrap(),
            full_name: "Ben Ramos".to_string(),
            email: None,
            phone: Some("+63 900 111 2222".to_string()),
            rank: "Bosun".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 7, 2),
            status: CrewStatus::Proposed,
            applied_at: Some(Utc.with_ymd_and_hms(2023, 12, 30, 6, 0, 0).unwrap()),
            documents: vec![CrewDocument {
                name: "SIRB".to_string(),
                place_issued: None,
                date_issued: None,
                expiry_date: NaiveDate::from_ymd_opt(2024, 1, 20),
            }],
            sea_service: Vec::new(),
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: CrewRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
