//! Journal rows as the entries view shows them.

use std::collections::HashMap;

use hearthlog_sync::{ENTRY_ID_FIELD, LIKED_BY_FIELD};
use hearthlog_types::{Coordinates, Entity, EntityId};

pub const TITLE_FIELD: &str = "title";
pub const AUTHOR_FIELD: &str = "author";
pub const CREATED_AT_FIELD: &str = "created_at";

/// One entry with its photo, comment and like counts folded in.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub id: EntityId,
    pub title: String,
    pub author: Option<String>,
    pub created_at_ms: Option<u64>,
    pub location: Option<Coordinates>,
    pub photos: usize,
    pub comments: usize,
    pub likes: usize,
    /// Whether the signed-in user has liked this entry.
    pub liked_by_me: bool,
}

/// Build rows newest first.
///
/// Photos, comments and likes that point at an entry not in `entries`
/// are ignored.
pub fn build_rows(
    entries: &[Entity],
    photos: &[Entity],
    comments: &[Entity],
    likes: &[Entity],
    me: Option<&str>,
) -> Vec<EntryRow> {
    let photo_counts = count_by_entry(photos);
    let comment_counts = count_by_entry(comments);
    let like_counts = count_by_entry(likes);

    let mut rows: Vec<EntryRow> = entries
        .iter()
        .map(|entry| {
            let id = entry.id.as_str();
            EntryRow {
                id: entry.id.clone(),
                title: entry
                    .text(TITLE_FIELD)
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or("(untitled)")
                    .to_string(),
                author: entry.text(AUTHOR_FIELD).map(str::to_string),
                created_at_ms: entry
                    .get(CREATED_AT_FIELD)
                    .and_then(|v| v.as_i64())
                    .and_then(|ms| u64::try_from(ms).ok()),
                location: entry.coordinates(),
                photos: photo_counts.get(id).copied().unwrap_or(0),
                comments: comment_counts.get(id).copied().unwrap_or(0),
                likes: like_counts.get(id).copied().unwrap_or(0),
                liked_by_me: me.is_some_and(|me| {
                    likes.iter().any(|like| {
                        like.text(ENTRY_ID_FIELD) == Some(id) && like.text(LIKED_BY_FIELD) == Some(me)
                    })
                }),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.created_at_ms
            .cmp(&a.created_at_ms)
            .then_with(|| a.title.cmp(&b.title))
    });
    rows
}

fn count_by_entry(rows: &[Entity]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for row in rows {
        if let Some(entry_id) = row.text(ENTRY_ID_FIELD) {
            *counts.entry(entry_id).or_default() += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearthlog_types::{EntityKind, NewEntity};

    fn entry(id: &str, title: &str, created_at: i64) -> Entity {
        NewEntity::new(EntityKind::Entry)
            .field(TITLE_FIELD, title)
            .field(CREATED_AT_FIELD, created_at)
            .into_entity(id)
    }

    fn child(kind: EntityKind, id: &str, entry_id: &str) -> Entity {
        NewEntity::new(kind)
            .field(ENTRY_ID_FIELD, entry_id)
            .into_entity(id)
    }

    #[test]
    fn newest_first_with_counts() {
        let entries = [entry("1", "Zoo", 100), entry("2", "Park", 200)];
        let photos = [
            child(EntityKind::Photo, "p1", "1"),
            child(EntityKind::Photo, "p2", "1"),
            child(EntityKind::Photo, "p3", "gone"),
        ];
        let comments = [child(EntityKind::Comment, "c1", "2")];

        let rows = build_rows(&entries, &photos, &comments, &[], None);

        assert_eq!(rows[0].title, "Park");
        assert_eq!(rows[0].comments, 1);
        assert_eq!(rows[1].title, "Zoo");
        assert_eq!(rows[1].photos, 2);
    }

    #[test]
    fn tracks_my_likes() {
        let entries = [entry("1", "Cake", 1)];
        let likes = [
            NewEntity::new(EntityKind::Like)
                .field(ENTRY_ID_FIELD, "1")
                .field(LIKED_BY_FIELD, "gran")
                .into_entity("l1"),
            NewEntity::new(EntityKind::Like)
                .field(ENTRY_ID_FIELD, "1")
                .field(LIKED_BY_FIELD, "dad")
                .into_entity("l2"),
        ];

        let rows = build_rows(&entries, &[], &[], &likes, Some("dad"));
        assert_eq!(rows[0].likes, 2);
        assert!(rows[0].liked_by_me);

        let rows = build_rows(&entries, &[], &[], &likes, Some("kid"));
        assert!(!rows[0].liked_by_me);
    }

    #[test]
    fn blank_titles_and_locations() {
        let located = NewEntity::new(EntityKind::Entry)
            .field(TITLE_FIELD, "  ")
            .located_at(Coordinates::new(51.5, -0.12).unwrap())
            .into_entity("1");

        let rows = build_rows(&[located], &[], &[], &[], None);
        assert_eq!(rows[0].title, "(untitled)");
        assert_eq!(rows[0].location.map(|c| c.lat), Some(51.5));
        assert_eq!(rows[0].created_at_ms, None);
    }
}
