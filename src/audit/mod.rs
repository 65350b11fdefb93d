//! Ownership metadata for audited tables.
//!
//! Embed [`AuditFields`] into a record and splice its `describe_fields`
//! fragment into the record's own descriptor to opt into creator/last-modifier
//! stamping. The bulk upsert engine rewrites the two reserved columns with the
//! in-scope acting user on every row it writes.

mod acting_user;

pub use acting_user::{current_user, with_acting_user};

use chrono::{DateTime, Datelike, Timelike, Utc};
use mysql_async::Value;

use crate::database::batch_upsert::{field, field_with_default, Field};

/// Reserved field name for the creator identity column.
pub const CREATED_BY_FIELD: &str = "created_by";
/// Reserved field name for the last-modifier identity column.
pub const UPDATED_BY_FIELD: &str = "updated_by";

pub const CREATED_AT_FIELD: &str = "created_at";
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Ownership columns shared by every auditable record.
///
/// Timestamps are optional so a fresh record leaves them blank and the
/// database-side `current_timestamp` default applies.
#[derive(Debug, Clone, Default)]
pub struct AuditFields {
    pub created_by: String,
    pub updated_by: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AuditFields {
    /// Descriptor fragment for the audit columns, for splicing into an
    /// `UpsertRecord::describe_fields` implementation.
    pub fn describe_fields(&self) -> Vec<Field> {
        vec![
            field(CREATED_BY_FIELD, self.created_by.as_str()),
            field(UPDATED_BY_FIELD, self.updated_by.as_str()),
            field_with_default(CREATED_AT_FIELD, datetime_value(self.created_at.as_ref())),
            field_with_default(UPDATED_AT_FIELD, datetime_value(self.updated_at.as_ref())),
        ]
    }

    /// Stamps ownership for a single-row create: both identities (when an
    /// acting user is in scope) and both timestamps.
    pub fn stamp_for_create(&mut self) {
        if let Some(user) = current_user() {
            self.created_by = user.clone();
            self.updated_by = user;
        }
        let now = Utc::now();
        self.created_at = Some(now);
        self.updated_at = Some(now);
    }

    /// Stamps ownership for a single-row update: last-modifier identity (when
    /// an acting user is in scope) and the update timestamp.
    pub fn stamp_for_update(&mut self) {
        if let Some(user) = current_user() {
            self.updated_by = user;
        }
        self.updated_at = Some(Utc::now());
    }
}

/// Whether a record's descriptor carries both reserved identity columns.
pub fn is_auditable(fields: &[Field]) -> bool {
    let mut has_created_by = false;
    let mut has_updated_by = false;
    for field in fields {
        has_created_by |= field.name == CREATED_BY_FIELD;
        has_updated_by |= field.name == UPDATED_BY_FIELD;
    }
    has_created_by && has_updated_by
}

/// Resolves the value a field contributes to a statement: the acting user for
/// the two reserved identity columns, the field's own value otherwise.
///
/// With no acting user in scope the field's value passes through untouched,
/// so an unattributed write still proceeds.
pub fn resolve_value(field: &Field, acting_user: Option<&str>) -> Value {
    match acting_user {
        Some(user) if field.name == CREATED_BY_FIELD || field.name == UPDATED_BY_FIELD => {
            Value::from(user)
        }
        _ => field.value.clone(),
    }
}

fn datetime_value(datetime: Option<&DateTime<Utc>>) -> Value {
    match datetime {
        None => Value::NULL,
        Some(datetime) => Value::Date(
            datetime.year() as u16,
            datetime.month() as u8,
            datetime.day() as u8,
            datetime.hour() as u8,
            datetime.minute() as u8,
            datetime.second() as u8,
            datetime.timestamp_subsec_micros(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_value_overrides_audit_fields() {
        let created_by = field(CREATED_BY_FIELD, "stale@test.com");
        let updated_by = field(UPDATED_BY_FIELD, "");
        let other = field("name", "unchanged");

        let user = Some("user@test.com");
        assert_eq!(resolve_value(&created_by, user), Value::from("user@test.com"));
        assert_eq!(resolve_value(&updated_by, user), Value::from("user@test.com"));
        assert_eq!(resolve_value(&other, user), Value::from("unchanged"));
    }

    #[test]
    fn test_resolve_value_passes_through_without_acting_user() {
        let created_by = field(CREATED_BY_FIELD, "existing@test.com");
        assert_eq!(resolve_value(&created_by, None), Value::from("existing@test.com"));

        let blank = field(UPDATED_BY_FIELD, "");
        assert_eq!(resolve_value(&blank, None), Value::Bytes(vec![]));
    }

    #[test]
    fn test_is_auditable_requires_both_identity_fields() {
        let auditable = AuditFields::default().describe_fields();
        assert!(is_auditable(&auditable));

        let partial = vec![field(CREATED_BY_FIELD, ""), field("name", "x")];
        assert!(!is_auditable(&partial));
    }

    #[test]
    fn test_fresh_audit_fields_leave_timestamps_to_the_database() {
        let fields = AuditFields::default().describe_fields();
        let timestamps: Vec<_> = fields
            .iter()
            .filter(|f| f.name == CREATED_AT_FIELD || f.name == UPDATED_AT_FIELD)
            .collect();

        assert_eq!(timestamps.len(), 2);
        // Blank values on default-carrying columns drop out of statements.
        assert!(timestamps.iter().all(|f| !f.is_selected()));
    }

    #[tokio::test]
    async fn test_stamp_for_create_and_update() {
        let mut audit = AuditFields::default();

        with_acting_user("creator@test.com", async {
            audit.stamp_for_create();
        })
        .await;
        assert_eq!(audit.created_by, "creator@test.com");
        assert_eq!(audit.updated_by, "creator@test.com");
        assert!(audit.created_at.is_some());

        with_acting_user("editor@test.com", async {
            audit.stamp_for_update();
        })
        .await;
        assert_eq!(audit.created_by, "creator@test.com");
        assert_eq!(audit.updated_by, "editor@test.com");
    }

    #[tokio::test]
    async fn test_stamp_without_scope_keeps_identities() {
        let mut audit = AuditFields { created_by: "kept@test.com".into(), ..Default::default() };
        audit.stamp_for_update();

        assert_eq!(audit.created_by, "kept@test.com");
        assert_eq!(audit.updated_by, "");
        assert!(audit.updated_at.is_some());
    }
}
