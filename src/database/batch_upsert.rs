use mysql_async::Value;

/// One persistable field of a record, described for statement building.
///
/// `name` is the logical field name, `column` the physical column name when it
/// differs. Whether the field participates in a statement is decided by
/// [`Field::is_selected`].
#[derive(Debug, Clone)]
pub struct Field {
    pub name: &'static str,
    pub column: Option<&'static str>,
    pub value: Value,
    pub is_primary_key: bool,
    pub is_ignored: bool,
    pub has_default: bool,
}

impl Field {
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.name)
    }

    /// A field is blank when its value equals the type's zero/empty/absent
    /// representation (0 for ints, empty for strings/bytes, NULL, zero date).
    pub fn is_blank(&self) -> bool {
        value_is_blank(&self.value)
    }

    /// A blank primary key is left to the database to generate, an ignored
    /// field never persists, and a blank field with a column default lets the
    /// default apply. Everything else participates in the statement.
    pub fn is_selected(&self) -> bool {
        !((self.is_primary_key && self.is_blank())
            || self.is_ignored
            || (self.has_default && self.is_blank()))
    }
}

/// Creates a plain field definition.
pub fn field(name: &'static str, value: impl Into<Value>) -> Field {
    Field {
        name,
        column: None,
        value: value.into(),
        is_primary_key: false,
        is_ignored: false,
        has_default: false,
    }
}

/// Creates a primary key field definition.
pub fn primary_key(name: &'static str, value: impl Into<Value>) -> Field {
    Field { is_primary_key: true, ..field(name, value) }
}

/// Creates a field definition whose column carries a database-side default.
pub fn field_with_default(name: &'static str, value: impl Into<Value>) -> Field {
    Field { has_default: true, ..field(name, value) }
}

/// Creates a field definition excluded from persistence.
pub fn ignored_field(name: &'static str, value: impl Into<Value>) -> Field {
    Field { is_ignored: true, ..field(name, value) }
}

/// Creates a field definition with a physical column name differing from the
/// logical field name.
pub fn field_in_column(
    name: &'static str,
    column: &'static str,
    value: impl Into<Value>,
) -> Field {
    Field { column: Some(column), ..field(name, value) }
}

/// Static schema descriptor for a record type that can be bulk upserted.
///
/// `describe_fields` must yield the same ordered set of field names for every
/// value of the type - the column list for a whole call is fixed from the
/// first record and every row's values must line up with it positionally.
pub trait UpsertRecord {
    const TABLE_NAME: &'static str;

    fn describe_fields(&self) -> Vec<Field>;
}

pub fn value_is_blank(value: &Value) -> bool {
    match value {
        Value::NULL => true,
        Value::Bytes(bytes) => bytes.is_empty(),
        Value::Int(v) => *v == 0,
        Value::UInt(v) => *v == 0,
        Value::Float(v) => *v == 0.0,
        Value::Double(v) => *v == 0.0,
        Value::Date(year, month, day, hour, minute, second, micro) => {
            *year == 0 &&
                *month == 0 &&
                *day == 0 &&
                *hour == 0 &&
                *minute == 0 &&
                *second == 0 &&
                *micro == 0
        }
        Value::Time(negative, days, hours, minutes, seconds, micro) => {
            !*negative &&
                *days == 0 &&
                *hours == 0 &&
                *minutes == 0 &&
                *seconds == 0 &&
                *micro == 0
        }
    }
}
