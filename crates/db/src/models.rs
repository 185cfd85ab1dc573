//! Row structs that map 1-to-1 onto tables in the `smidgen` schema.
//!
//! Each struct's first field is its primary identifier. The identifier is
//! assigned by the database on insert, so it defaults to zero when a record
//! arrives without one.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgTypeInfo, PgValueRef};
use sqlx::{FromRow, Postgres};
use thiserror::Error;
use uuid::Uuid;

use crate::record::{Field, FieldType, FieldValue, Record};

// ---------------------------------------------------------------------------
// businessunit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct BusinessUnit {
    #[serde(default)]
    pub unit_id: i32,
    pub name: String,
    pub point_of_contact: String,
    pub address_line_one: String,
    #[serde(default)]
    pub address_line_two: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Record for BusinessUnit {
    type Id = i32;

    const TABLE: &'static str = "businessunit";
    const ENTITY: &'static str = "BUSINESS_UNIT";
    const FIELDS: &'static [Field] = &[
        Field::new("unit_id", FieldType::Int),
        Field::new("name", FieldType::Text),
        Field::new("point_of_contact", FieldType::Text),
        Field::new("address_line_one", FieldType::Text),
        Field::new("address_line_two", FieldType::Text),
        Field::new("city", FieldType::Text),
        Field::new("state", FieldType::Text),
        Field::new("country", FieldType::Text),
    ];

    fn id(&self) -> i32 {
        self.unit_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.unit_id),
            FieldValue::Text(self.name.clone()),
            FieldValue::Text(self.point_of_contact.clone()),
            FieldValue::Text(self.address_line_one.clone()),
            FieldValue::Text(self.address_line_two.clone()),
            FieldValue::Text(self.city.clone()),
            FieldValue::Text(self.state.clone()),
            FieldValue::Text(self.country.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// equipment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    #[serde(default)]
    pub equipment_id: i32,
    pub business_unit_id: i32,
    pub manufacturer: String,
    pub model: String,
    pub description: Option<String>,
    pub date_received: DateTime<Utc>,
    pub last_inventoried: Option<DateTime<Utc>>,
}

impl Record for Equipment {
    type Id = i32;

    const TABLE: &'static str = "equipment";
    const ENTITY: &'static str = "EQUIPMENT";
    const FIELDS: &'static [Field] = &[
        Field::new("equipment_id", FieldType::Int),
        Field::new("business_unit_id", FieldType::Int),
        Field::new("manufacturer", FieldType::Text),
        Field::new("model", FieldType::Text),
        Field::nullable("description", FieldType::Text),
        Field::new("date_received", FieldType::Timestamp),
        Field::nullable("last_inventoried", FieldType::Timestamp),
    ];

    fn id(&self) -> i32 {
        self.equipment_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.equipment_id),
            FieldValue::Int(self.business_unit_id),
            FieldValue::Text(self.manufacturer.clone()),
            FieldValue::Text(self.model.clone()),
            FieldValue::NullableText(self.description.clone()),
            FieldValue::Timestamp(self.date_received),
            FieldValue::NullableTimestamp(self.last_inventoried),
        ]
    }
}

// ---------------------------------------------------------------------------
// equipment_assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EquipmentAssignment {
    #[serde(default)]
    pub assignment_id: i32,
    pub user_id: i32,
    pub equipment_id: i32,
    pub date_of_assignment: DateTime<Utc>,
}

impl Record for EquipmentAssignment {
    type Id = i32;

    const TABLE: &'static str = "equipment_assignment";
    const ENTITY: &'static str = "EQUIPMENT_ASSIGNMENT";
    const FIELDS: &'static [Field] = &[
        Field::new("assignment_id", FieldType::Int),
        Field::new("user_id", FieldType::Int),
        Field::new("equipment_id", FieldType::Int),
        Field::new("date_of_assignment", FieldType::Timestamp),
    ];

    fn id(&self) -> i32 {
        self.assignment_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.assignment_id),
            FieldValue::Int(self.user_id),
            FieldValue::Int(self.equipment_id),
            FieldValue::Timestamp(self.date_of_assignment),
        ]
    }
}

// ---------------------------------------------------------------------------
// manufacturers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Manufacturer {
    #[serde(default)]
    pub manufacturer_id: i32,
    pub name: String,
    pub primary_service: String,
    pub point_of_contact: String,
    pub location: String,
    pub date_added: DateTime<Utc>,
}

impl Record for Manufacturer {
    type Id = i32;

    const TABLE: &'static str = "manufacturers";
    const ENTITY: &'static str = "MANUFACTURER";
    const FIELDS: &'static [Field] = &[
        Field::new("manufacturer_id", FieldType::Int),
        Field::new("name", FieldType::Text),
        Field::new("primary_service", FieldType::Text),
        Field::new("point_of_contact", FieldType::Text),
        Field::new("location", FieldType::Text),
        Field::new("date_added", FieldType::Timestamp),
    ];

    fn id(&self) -> i32 {
        self.manufacturer_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.manufacturer_id),
            FieldValue::Text(self.name.clone()),
            FieldValue::Text(self.primary_service.clone()),
            FieldValue::Text(self.point_of_contact.clone()),
            FieldValue::Text(self.location.clone()),
            FieldValue::Timestamp(self.date_added),
        ]
    }
}

// ---------------------------------------------------------------------------
// smidgenusers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[serde(default)]
    pub user_id: i32,
    pub business_unit_id: i32,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub first_name: String,
    pub last_name: String,
    pub primary_email: String,
}

impl Record for User {
    type Id = i32;

    const TABLE: &'static str = "smidgenusers";
    const ENTITY: &'static str = "USER";
    const FIELDS: &'static [Field] = &[
        Field::new("user_id", FieldType::Int),
        Field::new("business_unit_id", FieldType::Int),
        Field::new("username", FieldType::Text),
        Field::new("password_hash", FieldType::Text),
        Field::new("password_salt", FieldType::Text),
        Field::new("first_name", FieldType::Text),
        Field::new("last_name", FieldType::Text),
        Field::new("primary_email", FieldType::Text),
    ];

    fn id(&self) -> i32 {
        self.user_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Int(self.user_id),
            FieldValue::Int(self.business_unit_id),
            FieldValue::Text(self.username.clone()),
            FieldValue::Text(self.password_hash.clone()),
            FieldValue::Text(self.password_salt.clone()),
            FieldValue::Text(self.first_name.clone()),
            FieldValue::Text(self.last_name.clone()),
            FieldValue::Text(self.primary_email.clone()),
        ]
    }
}

// ---------------------------------------------------------------------------
// auditlog
// ---------------------------------------------------------------------------

/// Outcome recorded for an audited operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditStatus {
    Success,
    Failed,
    Warn,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Warn => "WARN",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown audit status: {0}")]
pub struct UnknownAuditStatus(pub String);

impl FromStr for AuditStatus {
    type Err = UnknownAuditStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED"  => Ok(Self::Failed),
            "WARN"    => Ok(Self::Warn),
            other     => Err(UnknownAuditStatus(other.to_string())),
        }
    }
}

// Stored as plain text.
impl sqlx::Type<Postgres> for AuditStatus {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for AuditStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as sqlx::Decode<Postgres>>::decode(value)?;
        Ok(raw.parse()?)
    }
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuditEntry {
    pub log_id: Uuid,
    pub action_timestamp: DateTime<Utc>,
    pub action: String,
    pub action_status: AuditStatus,
}

impl AuditEntry {
    /// A fresh entry with a random identifier, stamped now.
    pub fn new(action: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            action_timestamp: Utc::now(),
            action: action.into(),
            action_status: status,
        }
    }
}

impl Record for AuditEntry {
    type Id = Uuid;

    const TABLE: &'static str = "auditlog";
    const ENTITY: &'static str = "AUDIT_LOG";
    const FIELDS: &'static [Field] = &[
        Field::new("log_id", FieldType::Uuid),
        Field::new("action_timestamp", FieldType::Timestamp),
        Field::new("action", FieldType::Text),
        Field::new("action_status", FieldType::Text),
    ];

    fn id(&self) -> Uuid {
        self.log_id
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Uuid(self.log_id),
            FieldValue::Timestamp(self.action_timestamp),
            FieldValue::Text(self.action.clone()),
            FieldValue::Text(self.action_status.as_str().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::assert_descriptor_matches;
    use chrono::TimeZone;

    fn received() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn hq() -> BusinessUnit {
        BusinessUnit {
            unit_id: 0,
            name: "HQ".into(),
            point_of_contact: "J. Doe".into(),
            address_line_one: "1 Main St".into(),
            address_line_two: "Suite 100".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn every_descriptor_matches_its_values() {
        assert_descriptor_matches(&hq());
        assert_descriptor_matches(&Equipment {
            equipment_id: 3,
            business_unit_id: 1,
            manufacturer: "Acme".into(),
            model: "R-2".into(),
            description: None,
            date_received: received(),
            last_inventoried: Some(received()),
        });
        assert_descriptor_matches(&EquipmentAssignment {
            assignment_id: 1,
            user_id: 2,
            equipment_id: 3,
            date_of_assignment: received(),
        });
        assert_descriptor_matches(&Manufacturer {
            manufacturer_id: 1,
            name: "Acme".into(),
            primary_service: "Radios".into(),
            point_of_contact: "R. Roe".into(),
            location: "Tulsa".into(),
            date_added: received(),
        });
        assert_descriptor_matches(&User {
            user_id: 1,
            business_unit_id: 1,
            username: "jdoe".into(),
            password_hash: "h".into(),
            password_salt: "s".into(),
            first_name: "J".into(),
            last_name: "Doe".into(),
            primary_email: "jdoe@example.com".into(),
        });
        assert_descriptor_matches(&AuditEntry::new("ADD_BUSINESS_UNIT", AuditStatus::Success));
    }

    #[test]
    fn identifiers_come_first_and_entities_are_distinct() {
        assert_eq!(BusinessUnit::id_field().column, "unit_id");
        assert_eq!(Equipment::id_field().column, "equipment_id");
        assert_eq!(EquipmentAssignment::id_field().column, "assignment_id");
        assert_eq!(Manufacturer::id_field().column, "manufacturer_id");
        assert_eq!(User::id_field().column, "user_id");
        assert_eq!(AuditEntry::id_field().column, "log_id");
    }

    #[test]
    fn field_lookup_ignores_case() {
        assert_eq!(BusinessUnit::field("UNIT_ID").map(|f| f.column), Some("unit_id"));
        assert!(BusinessUnit::field("unitid").is_none());
        assert!(Equipment::field("equipment_id; --").is_none());
    }

    #[test]
    fn business_unit_json_without_id_or_second_line() {
        let unit: BusinessUnit = serde_json::from_str(
            r#"{"name":"HQ","point_of_contact":"J. Doe","address_line_one":"1 Main St",
                "city":"Springfield","state":"IL","country":"US"}"#,
        )
        .unwrap();
        assert_eq!(unit.unit_id, 0);
        assert_eq!(unit.address_line_two, "");
        assert_eq!(unit.city, "Springfield");
    }

    #[test]
    fn audit_status_round_trips_through_text() {
        for status in [AuditStatus::Success, AuditStatus::Failed, AuditStatus::Warn] {
            assert_eq!(status.as_str().parse::<AuditStatus>().unwrap(), status);
        }
        assert!("Failed".parse::<AuditStatus>().is_err());
        assert_eq!(serde_json::to_string(&AuditStatus::Warn).unwrap(), "\"WARN\"");
    }

    #[test]
    fn new_audit_entries_get_unique_ids() {
        let a = AuditEntry::new("GET_EQUIPMENT", AuditStatus::Warn);
        let b = AuditEntry::new("GET_EQUIPMENT", AuditStatus::Warn);
        assert_ne!(a.log_id, b.log_id);
        assert_eq!(a.action, "GET_EQUIPMENT");
    }
}
