//! Required-field checks applied to incoming records.
//!
//! A field is missing when it holds its zero value: a blank string or an
//! integer reference of 0. Identifiers are assigned by the database and are
//! never required, nor is a business unit's second address line. Timestamps
//! cannot be zero once deserialized.

use db::models::{BusinessUnit, Equipment, EquipmentAssignment, Manufacturer, User};

use crate::ServiceError;

pub trait RequiredFields {
    /// Name of the first required field holding its zero value.
    fn missing_field(&self) -> Option<&'static str>;

    fn check_required(&self) -> Result<(), ServiceError> {
        match self.missing_field() {
            Some(field) => Err(ServiceError::MissingField(field)),
            None => Ok(()),
        }
    }
}

fn first_missing(checks: &[(&'static str, bool)]) -> Option<&'static str> {
    checks
        .iter()
        .find_map(|&(name, missing)| missing.then_some(name))
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

impl RequiredFields for BusinessUnit {
    fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("name", blank(&self.name)),
            ("point_of_contact", blank(&self.point_of_contact)),
            ("address_line_one", blank(&self.address_line_one)),
            ("city", blank(&self.city)),
            ("state", blank(&self.state)),
            ("country", blank(&self.country)),
        ])
    }
}

impl RequiredFields for Equipment {
    fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("business_unit_id", self.business_unit_id == 0),
            ("manufacturer", blank(&self.manufacturer)),
            ("model", blank(&self.model)),
        ])
    }
}

impl RequiredFields for EquipmentAssignment {
    fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("user_id", self.user_id == 0),
            ("equipment_id", self.equipment_id == 0),
        ])
    }
}

impl RequiredFields for Manufacturer {
    fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("name", blank(&self.name)),
            ("primary_service", blank(&self.primary_service)),
            ("point_of_contact", blank(&self.point_of_contact)),
            ("location", blank(&self.location)),
        ])
    }
}

impl RequiredFields for User {
    fn missing_field(&self) -> Option<&'static str> {
        first_missing(&[
            ("business_unit_id", self.business_unit_id == 0),
            ("username", blank(&self.username)),
            ("password_hash", blank(&self.password_hash)),
            ("password_salt", blank(&self.password_salt)),
            ("first_name", blank(&self.first_name)),
            ("last_name", blank(&self.last_name)),
            ("primary_email", blank(&self.primary_email)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit() -> BusinessUnit {
        BusinessUnit {
            unit_id: 0,
            name: "HQ".into(),
            point_of_contact: "J. Doe".into(),
            address_line_one: "1 Main St".into(),
            address_line_two: "Suite 2".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            country: "US".into(),
        }
    }

    #[test]
    fn complete_records_pass_without_an_id() {
        assert!(unit().check_required().is_ok());

        let equipment = Equipment {
            equipment_id: 0,
            business_unit_id: 1,
            manufacturer: "Acme".into(),
            model: "X1".into(),
            description: None,
            date_received: Utc::now(),
            last_inventoried: None,
        };
        assert!(equipment.check_required().is_ok());
    }

    #[test]
    fn whitespace_counts_as_blank() {
        let record = BusinessUnit { city: "   ".into(), ..unit() };
        assert!(matches!(record.check_required(), Err(ServiceError::MissingField("city"))));
    }

    #[test]
    fn first_missing_field_in_column_order_is_reported() {
        let record = BusinessUnit {
            name: String::new(),
            country: String::new(),
            ..unit()
        };
        assert_eq!(record.missing_field(), Some("name"));
    }

    #[test]
    fn zero_references_are_missing() {
        let assignment = EquipmentAssignment {
            assignment_id: 0,
            user_id: 3,
            equipment_id: 0,
            date_of_assignment: Utc::now(),
        };
        assert_eq!(assignment.missing_field(), Some("equipment_id"));

        let user = User {
            user_id: 0,
            business_unit_id: 0,
            username: "jdoe".into(),
            password_hash: "h".into(),
            password_salt: "s".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            primary_email: "jdoe@example.com".into(),
        };
        assert_eq!(user.missing_field(), Some("business_unit_id"));
    }

    #[test]
    fn manufacturer_location_is_required() {
        let manufacturer = Manufacturer {
            manufacturer_id: 0,
            name: "Acme".into(),
            primary_service: "Forklifts".into(),
            point_of_contact: "R. Runner".into(),
            location: "".into(),
            date_added: Utc::now(),
        };
        assert_eq!(manufacturer.missing_field(), Some("location"));
    }
}
