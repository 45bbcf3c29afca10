//! Record kinds tracked by the registry and their field schemas.
//!
//! # Purpose
//! Every module (partners, events, memberships, ...) shares one storage shape
//! and one workflow. What differs per module is captured by a static
//! [`ModuleDescriptor`]: the URL slug, which field names the record in
//! listings, which fields are required, which fields hold dates, and which
//! date (if any) drives expiry.
//!
//! # Key invariants
//! - `REGISTRY[m as usize].module == m` for every module `m`.
//! - Field values are JSON scalars; nested objects and arrays are rejected.
//! - Values in date fields start with a `YYYY-MM-DD` calendar date.
use crate::model::record::Fields;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(
    Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "kebab-case")]
pub enum Module {
    Partners,
    CampusVisits,
    Events,
    Conferences,
    MouSigningCeremonies,
    ScholarsInResidence,
    MouUpdates,
    ImmersionPrograms,
    StudentExchanges,
    MastersAbroad,
    Memberships,
    DigitalMedia,
    Outreach,
}

#[derive(Debug)]
pub struct ModuleDescriptor {
    pub module: Module,
    pub slug: &'static str,
    pub label: &'static str,
    pub display_field: &'static str,
    pub required_fields: &'static [&'static str],
    pub date_fields: &'static [&'static str],
    pub expiry_field: Option<&'static str>,
}

static REGISTRY: [ModuleDescriptor; 13] = [
    ModuleDescriptor {
        module: Module::Partners,
        slug: "partners",
        label: "Partner",
        display_field: "institution",
        required_fields: &["institution", "country"],
        date_fields: &["signedDate", "expiringDate"],
        expiry_field: Some("expiringDate"),
    },
    ModuleDescriptor {
        module: Module::CampusVisits,
        slug: "campus-visits",
        label: "Campus Visit",
        display_field: "delegation",
        required_fields: &["delegation", "visitDate"],
        date_fields: &["visitDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::Events,
        slug: "events",
        label: "Event",
        display_field: "title",
        required_fields: &["title"],
        date_fields: &["eventDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::Conferences,
        slug: "conferences",
        label: "Conference",
        display_field: "title",
        required_fields: &["title"],
        date_fields: &["startDate", "endDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::MouSigningCeremonies,
        slug: "mou-signing-ceremonies",
        label: "MOU Signing Ceremony",
        display_field: "partnerInstitution",
        required_fields: &["partnerInstitution"],
        date_fields: &["ceremonyDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::ScholarsInResidence,
        slug: "scholars-in-residence",
        label: "Scholar in Residence",
        display_field: "scholarName",
        required_fields: &["scholarName"],
        date_fields: &["fromDate", "toDate"],
        expiry_field: Some("toDate"),
    },
    ModuleDescriptor {
        module: Module::MouUpdates,
        slug: "mou-updates",
        label: "MOU Update",
        display_field: "partnerInstitution",
        required_fields: &["partnerInstitution"],
        date_fields: &["updateDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::ImmersionPrograms,
        slug: "immersion-programs",
        label: "Immersion Program",
        display_field: "programName",
        required_fields: &["programName"],
        date_fields: &["departureDate", "returnDate"],
        expiry_field: Some("departureDate"),
    },
    ModuleDescriptor {
        module: Module::StudentExchanges,
        slug: "student-exchanges",
        label: "Student Exchange",
        display_field: "studentName",
        required_fields: &["studentName"],
        date_fields: &["fromDate", "toDate"],
        expiry_field: Some("toDate"),
    },
    ModuleDescriptor {
        module: Module::MastersAbroad,
        slug: "masters-abroad",
        label: "Masters Abroad",
        display_field: "studentName",
        required_fields: &["studentName"],
        date_fields: &["startDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::Memberships,
        slug: "memberships",
        label: "Membership",
        display_field: "organization",
        required_fields: &["organization"],
        date_fields: &["startDate", "endDate"],
        expiry_field: Some("endDate"),
    },
    ModuleDescriptor {
        module: Module::DigitalMedia,
        slug: "digital-media",
        label: "Digital Media",
        display_field: "title",
        required_fields: &["title"],
        date_fields: &["publishedDate"],
        expiry_field: None,
    },
    ModuleDescriptor {
        module: Module::Outreach,
        slug: "outreach",
        label: "Outreach",
        display_field: "activity",
        required_fields: &["activity"],
        date_fields: &["activityDate"],
        expiry_field: None,
    },
];

impl Module {
    pub const ALL: [Module; 13] = [
        Module::Partners,
        Module::CampusVisits,
        Module::Events,
        Module::Conferences,
        Module::MouSigningCeremonies,
        Module::ScholarsInResidence,
        Module::MouUpdates,
        Module::ImmersionPrograms,
        Module::StudentExchanges,
        Module::MastersAbroad,
        Module::Memberships,
        Module::DigitalMedia,
        Module::Outreach,
    ];

    pub fn descriptor(self) -> &'static ModuleDescriptor {
        &REGISTRY[self as usize]
    }

    pub fn slug(self) -> &'static str {
        self.descriptor().slug
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|descriptor| descriptor.slug == slug)
            .map(|descriptor| descriptor.module)
    }

    /// Modules whose records carry a natural expiry date.
    pub fn expiring() -> impl Iterator<Item = (Module, &'static str)> {
        REGISTRY
            .iter()
            .filter_map(|descriptor| descriptor.expiry_field.map(|f| (descriptor.module, f)))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("field `{0}` is required")]
    Missing(&'static str),
    #[error("field names must not be empty")]
    EmptyName,
    #[error("field `{0}` must be a string, number, boolean or null")]
    NotScalar(String),
    #[error("field `{field}` must be a date (YYYY-MM-DD), got `{value}`")]
    BadDate { field: String, value: String },
    #[error("no fields supplied")]
    Empty,
}

/// Parsed state of a date-bearing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDate {
    Absent,
    Date(NaiveDate),
    Malformed,
}

pub fn field_date(fields: &Fields, name: &str) -> FieldDate {
    match fields.get(name) {
        None | Some(Value::Null) => FieldDate::Absent,
        Some(Value::String(raw)) => parse_date(raw),
        Some(_) => FieldDate::Malformed,
    }
}

fn parse_date(raw: &str) -> FieldDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return FieldDate::Absent;
    }
    // Accept `YYYY-MM-DD` optionally followed by a time part (`T...` or ` ...`).
    let Some(day) = raw.get(..10) else {
        return FieldDate::Malformed;
    };
    let rest = &raw[10..];
    if !(rest.is_empty() || rest.starts_with('T') || rest.starts_with(' ')) {
        return FieldDate::Malformed;
    }
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => FieldDate::Date(date),
        Err(_) => FieldDate::Malformed,
    }
}

impl ModuleDescriptor {
    /// Validate the field set of a newly created record.
    pub fn validate_new(&self, fields: &Fields) -> Result<(), FieldError> {
        self.validate_values(fields)?;
        for required in self.required_fields {
            if is_blank(fields.get(*required)) {
                return Err(FieldError::Missing(required));
            }
        }
        Ok(())
    }

    /// Validate a partial update. Required fields may be omitted but not blanked.
    pub fn validate_changes(&self, changes: &Fields) -> Result<(), FieldError> {
        if changes.is_empty() {
            return Err(FieldError::Empty);
        }
        self.validate_values(changes)?;
        for required in self.required_fields {
            if changes.contains_key(*required) && is_blank(changes.get(*required)) {
                return Err(FieldError::Missing(required));
            }
        }
        Ok(())
    }

    pub fn display_name<'a>(&self, fields: &'a Fields) -> Option<&'a str> {
        fields.get(self.display_field).and_then(Value::as_str)
    }

    fn validate_values(&self, fields: &Fields) -> Result<(), FieldError> {
        for (name, value) in fields {
            if name.trim().is_empty() {
                return Err(FieldError::EmptyName);
            }
            if matches!(value, Value::Array(_) | Value::Object(_)) {
                return Err(FieldError::NotScalar(name.clone()));
            }
        }
        for date in self.date_fields {
            if field_date(fields, date) == FieldDate::Malformed {
                return Err(FieldError::BadDate {
                    field: (*date).to_string(),
                    value: fields.get(*date).map(Value::to_string).unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn registry_is_indexed_by_module() {
        for module in Module::ALL {
            assert_eq!(module.descriptor().module, module);
            assert_eq!(Module::from_slug(module.slug()), Some(module));
            let encoded = serde_json::to_value(module).expect("encode");
            assert_eq!(encoded, json!(module.slug()));
        }
        assert_eq!(Module::from_slug("unknown"), None);
    }

    #[test]
    fn expiring_modules_cover_the_dated_kinds() {
        let expiring: Vec<_> = Module::expiring().collect();
        assert_eq!(
            expiring,
            vec![
                (Module::Partners, "expiringDate"),
                (Module::ScholarsInResidence, "toDate"),
                (Module::ImmersionPrograms, "departureDate"),
                (Module::StudentExchanges, "toDate"),
                (Module::Memberships, "endDate"),
            ]
        );
    }

    #[test]
    fn field_date_accepts_dates_and_timestamps() {
        let f = fields(json!({
            "a": "2020-01-01",
            "b": "2020-01-01T10:00:00Z",
            "c": "",
            "d": null,
            "e": "01/02/2020",
            "f": 42,
            "g": "2020-02-30"
        }));
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(field_date(&f, "a"), FieldDate::Date(day));
        assert_eq!(field_date(&f, "b"), FieldDate::Date(day));
        assert_eq!(field_date(&f, "c"), FieldDate::Absent);
        assert_eq!(field_date(&f, "d"), FieldDate::Absent);
        assert_eq!(field_date(&f, "missing"), FieldDate::Absent);
        assert_eq!(field_date(&f, "e"), FieldDate::Malformed);
        assert_eq!(field_date(&f, "f"), FieldDate::Malformed);
        assert_eq!(field_date(&f, "g"), FieldDate::Malformed);
    }

    #[test]
    fn validate_new_checks_required_scalars_and_dates() {
        let partners = Module::Partners.descriptor();
        assert!(partners
            .validate_new(&fields(json!({"institution": "Trinity", "country": "UK"})))
            .is_ok());
        assert_eq!(
            partners.validate_new(&fields(json!({"institution": "Trinity"}))),
            Err(FieldError::Missing("country"))
        );
        assert_eq!(
            partners.validate_new(&fields(json!({"institution": "  ", "country": "UK"}))),
            Err(FieldError::Missing("institution"))
        );
        assert_eq!(
            partners.validate_new(&fields(
                json!({"institution": "T", "country": "UK", "tags": ["a"]})
            )),
            Err(FieldError::NotScalar("tags".to_string()))
        );
        assert!(matches!(
            partners.validate_new(&fields(
                json!({"institution": "T", "country": "UK", "expiringDate": "soon"})
            )),
            Err(FieldError::BadDate { .. })
        ));
    }

    #[test]
    fn validate_changes_allows_partial_but_not_blanking() {
        let partners = Module::Partners.descriptor();
        assert!(partners
            .validate_changes(&fields(json!({"country": "Ireland"})))
            .is_ok());
        assert_eq!(
            partners.validate_changes(&Fields::new()),
            Err(FieldError::Empty)
        );
        assert_eq!(
            partners.validate_changes(&fields(json!({"country": ""}))),
            Err(FieldError::Missing("country"))
        );
        assert_eq!(
            partners.validate_changes(&fields(json!({"": 1}))),
            Err(FieldError::EmptyName)
        );
    }
}
