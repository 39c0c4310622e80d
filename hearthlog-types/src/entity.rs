//! Journal entities as stored by the remote gateway.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::fmt;

use crate::Coordinates;

/// The tables the journal reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EntityKind {
    /// A journal entry (title, body, date, optional location).
    Entry,
    /// A photo attached to an entry.
    Photo,
    /// A comment left on an entry by a family member.
    Comment,
    /// A "like" left on an entry.
    Like,
}

impl EntityKind {
    /// Every table, in display order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Entry,
        EntityKind::Photo,
        EntityKind::Comment,
        EntityKind::Like,
    ];

    /// Name of the backing table.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Entry => "entries",
            EntityKind::Photo => "photos",
            EntityKind::Comment => "comments",
            EntityKind::Like => "likes",
        }
    }

    /// Look up a kind by its table name.
    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.table() == table)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A scalar column value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content as `f64`, accepting integers and numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Integer content, if this is an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

/// Column values keyed by column name. Also used as an update patch.
pub type Fields = BTreeMap<String, FieldValue>;

/// Field name holding a location's latitude.
pub const LATITUDE_FIELD: &str = "latitude";
/// Field name holding a location's longitude.
pub const LONGITUDE_FIELD: &str = "longitude";

/// A row that exists in the remote store.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub fields: Fields,
}

impl Entity {
    /// Create an entity with no fields.
    pub fn new(id: impl Into<EntityId>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            fields: Fields::new(),
        }
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Get a text field by name.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// The entity's location, when it carries valid latitude/longitude fields.
    pub fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.get(LATITUDE_FIELD)?.as_f64()?;
        let lng = self.get(LONGITUDE_FIELD)?.as_f64()?;
        Coordinates::new(lat, lng).ok()
    }

    /// Apply a patch in place; `Null` values are stored, not removed.
    pub fn apply(&mut self, patch: &Fields) {
        for (name, value) in patch {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

/// A row to be created; the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewEntity {
    pub kind: EntityKind,
    pub fields: Fields,
}

impl NewEntity {
    /// Start a new row of the given kind.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            fields: Fields::new(),
        }
    }

    /// Set a field (builder style).
    pub fn field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Set the location fields.
    pub fn located_at(self, at: Coordinates) -> Self {
        self.field(LATITUDE_FIELD, at.lat)
            .field(LONGITUDE_FIELD, at.lng)
    }

    /// Materialize into an entity with the given id.
    pub fn into_entity(self, id: impl Into<EntityId>) -> Entity {
        Entity {
            id: id.into(),
            kind: self.kind,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_table(kind.table()), Some(kind));
        }
        assert_eq!(EntityKind::from_table("recipes"), None);
    }

    #[test]
    fn apply_patch_overwrites_and_adds() {
        let mut entity = NewEntity::new(EntityKind::Entry)
            .field("title", "Draft")
            .into_entity("1");

        let mut patch = Fields::new();
        patch.insert("title".to_string(), "Final".into());
        patch.insert("mood".to_string(), FieldValue::Int(4));
        entity.apply(&patch);

        assert_eq!(entity.text("title"), Some("Final"));
        assert_eq!(entity.get("mood"), Some(&FieldValue::Int(4)));
    }

    #[test]
    fn coordinates_read_from_numeric_or_text_fields() {
        let entity = NewEntity::new(EntityKind::Entry)
            .field(LATITUDE_FIELD, "51.5")
            .field(LONGITUDE_FIELD, -0.12)
            .into_entity("7");

        let at = entity.coordinates().unwrap();
        assert_eq!(at.lat, 51.5);
        assert_eq!(at.lng, -0.12);
    }

    #[test]
    fn out_of_range_coordinates_are_ignored() {
        let entity = NewEntity::new(EntityKind::Entry)
            .field(LATITUDE_FIELD, 123.0)
            .field(LONGITUDE_FIELD, 0.0)
            .into_entity("8");

        assert!(entity.coordinates().is_none());
    }

    #[test]
    fn optional_values_become_null() {
        let none: Option<&str> = None;
        assert!(FieldValue::from(none).is_null());
        assert_eq!(FieldValue::from(Some(3i64)), FieldValue::Int(3));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn field_values_serialize_untagged() {
        let draft = NewEntity::new(EntityKind::Like)
            .field("entry_id", "12")
            .field("count", 2i64)
            .field("seen", true);

        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["kind"], "like");
        assert_eq!(json["fields"]["count"], 2);
        assert_eq!(json["fields"]["seen"], true);
    }
}
