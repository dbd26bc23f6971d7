//! Tag normalization and note tag-set reconciliation.
//!
//! Tags are shared across notes and keyed by their normalized text. A note
//! save replaces the note's tag membership with the cleaned row set; tags
//! that lose their last note are left in place.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::entity::{note_tag, tag};
use crate::error::AppError;

pub const MAX_TAG_LEN: usize = 30;
pub const MAX_TAG_ROWS: usize = 10;

/// Trims, collapses inner whitespace runs to one space and lowercases.
pub fn normalize_tag(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Cleans the submitted tag rows into an ordered, duplicate-free tag set.
///
/// Empty rows are skipped. A normalized tag over [`MAX_TAG_LEN`] characters
/// fails on the field `tags.<row index>`.
pub fn clean_tags<S: AsRef<str>>(rows: &[S]) -> Result<Vec<String>, AppError> {
    if rows.len() > MAX_TAG_ROWS {
        return Err(AppError::field(
            "tags",
            format!("at most {} tags per note", MAX_TAG_ROWS),
        ));
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::new();
    for (idx, raw) in rows.iter().enumerate() {
        let tag = normalize_tag(raw.as_ref());
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LEN {
            return Err(AppError::field(
                format!("tags.{}", idx),
                "one tag should be maximum 30 characters long",
            ));
        }
        if seen.insert(tag.clone()) {
            cleaned.push(tag);
        }
    }
    Ok(cleaned)
}

/// Looks up or creates a tag row for every name, preserving input order.
pub async fn resolve_tags<C: ConnectionTrait>(db: &C, names: &[String]) -> Result<Vec<tag::Model>, AppError> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let existing = tag::Entity::find()
        .filter(tag::Column::Tag.is_in(names.iter().cloned()))
        .all(db)
        .await?;
    let mut by_name: HashMap<String, tag::Model> =
        existing.into_iter().map(|t| (t.tag.clone(), t)).collect();

    let mut resolved = Vec::with_capacity(names.len());
    for name in names {
        if let Some(found) = by_name.remove(name) {
            resolved.push(found);
            continue;
        }
        let active = tag::ActiveModel {
            tag: Set(name.clone()),
            ..Default::default()
        };
        let created = match active.insert(db).await {
            Ok(model) => model,
            // lost a race on the unique index, the row is there now
            Err(err) => {
                warn!("tag insert failed tag={} err={}", name, err);
                tag::Entity::find()
                    .filter(tag::Column::Tag.eq(name.as_str()))
                    .one(db)
                    .await?
                    .ok_or_else(AppError::system_exception)?
            }
        };
        debug!("tag created id={} tag={}", created.id, created.tag);
        resolved.push(created);
    }
    Ok(resolved)
}

/// Sets the note's tag membership to exactly `tag_ids`.
pub async fn replace_note_tags<C: ConnectionTrait>(db: &C, note_id: i32, tag_ids: &[i32]) -> Result<(), AppError> {
    let mut stale = note_tag::Entity::delete_many().filter(note_tag::Column::NoteId.eq(note_id));
    if !tag_ids.is_empty() {
        stale = stale.filter(note_tag::Column::TagId.is_not_in(tag_ids.iter().copied()));
    }
    stale.exec(db).await?;

    let current: HashSet<i32> = note_tag::Entity::find()
        .filter(note_tag::Column::NoteId.eq(note_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.tag_id)
        .collect();

    for tag_id in tag_ids.iter().filter(|id| !current.contains(id)) {
        note_tag::ActiveModel {
            note_id: Set(note_id),
            tag_id: Set(*tag_id),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Tag names per note id, sorted by name.
pub async fn tags_for_notes<C: ConnectionTrait>(
    db: &C,
    note_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, AppError> {
    let mut out: HashMap<i32, Vec<String>> = HashMap::new();
    if note_ids.is_empty() {
        return Ok(out);
    }
    let links = note_tag::Entity::find()
        .filter(note_tag::Column::NoteId.is_in(note_ids.iter().copied()))
        .all(db)
        .await?;
    if links.is_empty() {
        return Ok(out);
    }

    let tag_ids: HashSet<i32> = links.iter().map(|l| l.tag_id).collect();
    let names: HashMap<i32, String> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tag_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.tag))
        .collect();

    for link in links {
        if let Some(name) = names.get(&link.tag_id) {
            out.entry(link.note_id).or_default().push(name.clone());
        }
    }
    for list in out.values_mut() {
        list.sort();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_lowercases() {
        assert_eq!(normalize_tag("  Machine \t  Learning \n"), "machine learning");
        assert_eq!(normalize_tag("SQL"), "sql");
        assert_eq!(normalize_tag("   "), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["  Rust  Lang ", "already normal", "ÄÖÜ  Umlaut", "x"] {
            let once = normalize_tag(raw);
            assert_eq!(normalize_tag(&once), once);
        }
    }

    #[test]
    fn duplicate_rows_collapse_in_first_seen_order() {
        let cleaned = clean_tags(&["  SQL ", "sql", "Python"]).unwrap();
        assert_eq!(cleaned, vec!["sql".to_string(), "python".to_string()]);
    }

    #[test]
    fn empty_rows_yield_empty_set() {
        let cleaned = clean_tags(&["", "   ", "\t"]).unwrap();
        assert!(cleaned.is_empty());
    }

    #[test]
    fn over_long_tag_fails_on_its_row() {
        let long = "a".repeat(MAX_TAG_LEN + 1);
        let err = clean_tags(&["ok", long.as_str()]).unwrap_err();
        assert_eq!(err.field_name(), Some("tags.1"));
        assert_eq!(err.msg(), "one tag should be maximum 30 characters long");
    }

    #[test]
    fn length_is_checked_after_normalization() {
        // 30 visible chars padded with whitespace is still valid
        let padded = format!("   {}   ", "b".repeat(MAX_TAG_LEN));
        assert_eq!(clean_tags(&[padded]).unwrap().len(), 1);
        // multibyte chars count once
        let wide = "é".repeat(MAX_TAG_LEN);
        assert_eq!(clean_tags(&[wide]).unwrap().len(), 1);
    }

    #[test]
    fn too_many_rows_rejected() {
        let rows: Vec<String> = (0..=MAX_TAG_ROWS).map(|i| format!("t{}", i)).collect();
        let err = clean_tags(&rows).unwrap_err();
        assert_eq!(err.field_name(), Some("tags"));
    }
}
