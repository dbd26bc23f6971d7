//! Ownership-scoped note queries and note mutations.
//!
//! A requester sees a note when it is public or when they own it. Edit and
//! delete need ownership. Both predicates answer `AppError::NotFound`
//! on failure so callers cannot probe for private notes.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::entity::{note, note_tag, user, user_like};
use crate::error::{map_tx_error, AppError};
use crate::forms::NoteInput;
use crate::{likes, tags};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Deserialize, Default, Clone, Copy, Debug)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub size: Option<u64>,
}

impl PageQuery {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page: Some(page), size: Some(size) }
    }

    fn resolve(&self) -> (u64, u64) {
        let page = self.page.unwrap_or(1).max(1);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        (page, size)
    }

    /// Row offset of the resolved page. Saturates, so an absurd page is
    /// just an empty one.
    fn offset(&self) -> u64 {
        let (page, size) = self.resolve();
        (page - 1).saturating_mul(size).min(i64::MAX as u64)
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub total_page: u64,
}

/// A note with its tag set, liked-by set and author attached.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NoteView {
    pub id: i32,
    pub user_id: i32,
    pub author_name: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<String>,
    pub liked_by: Vec<i32>,
    pub like_count: usize,
    /// Whether the requester is in `liked_by`.
    pub liked: bool,
}

/// Rows a requester may read: public ones, plus their own.
pub fn visible_to(requester: Option<i32>) -> Condition {
    let cond = Condition::any().add(note::Column::IsPublic.eq(true));
    match requester {
        Some(user_id) => cond.add(note::Column::UserId.eq(user_id)),
        None => cond,
    }
}

pub async fn list_by_owner<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    page: PageQuery,
) -> Result<Page<NoteView>, AppError> {
    let cond = Condition::all().add(note::Column::UserId.eq(owner_id));
    list_where(db, cond, Some(owner_id), page).await
}

pub async fn list_public<C: ConnectionTrait>(
    db: &C,
    requester: Option<i32>,
    page: PageQuery,
) -> Result<Page<NoteView>, AppError> {
    let cond = Condition::all().add(note::Column::IsPublic.eq(true));
    list_where(db, cond, requester, page).await
}

pub async fn count_public<C: ConnectionTrait>(db: &C) -> Result<u64, AppError> {
    Ok(note::Entity::find()
        .filter(note::Column::IsPublic.eq(true))
        .count(db)
        .await?)
}

pub async fn find_visible<C: ConnectionTrait>(
    db: &C,
    id: i32,
    requester: Option<i32>,
) -> Result<NoteView, AppError> {
    let model = find_visible_model(db, id, requester).await?;
    single_view(db, model, requester).await
}

pub async fn find_owned<C: ConnectionTrait>(db: &C, id: i32, owner_id: i32) -> Result<NoteView, AppError> {
    let model = find_owned_model(db, id, owner_id).await?;
    single_view(db, model, Some(owner_id)).await
}

pub(crate) async fn find_visible_model<C: ConnectionTrait>(
    db: &C,
    id: i32,
    requester: Option<i32>,
) -> Result<note::Model, AppError> {
    note::Entity::find_by_id(id)
        .filter(visible_to(requester))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

async fn find_owned_model<C: ConnectionTrait>(db: &C, id: i32, owner_id: i32) -> Result<note::Model, AppError> {
    note::Entity::find_by_id(id)
        .filter(note::Column::UserId.eq(owner_id))
        .one(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn create_note(db: &DatabaseConnection, owner_id: i32, input: NoteInput) -> Result<NoteView, AppError> {
    let saved = db
        .transaction::<_, note::Model, AppError>(move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let inserted = note::ActiveModel {
                    user_id: Set(owner_id),
                    title: Set(input.title),
                    description: Set(input.description),
                    link: Set(input.link),
                    is_public: Set(input.is_public),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                save_tags(txn, inserted.id, &input.tags).await?;
                Ok(inserted)
            })
        })
        .await
        .map_err(map_tx_error)?;

    info!("note created id={} owner={}", saved.id, owner_id);
    single_view(db, saved, Some(owner_id)).await
}

pub async fn update_note(
    db: &DatabaseConnection,
    id: i32,
    owner_id: i32,
    input: NoteInput,
) -> Result<NoteView, AppError> {
    let saved = db
        .transaction::<_, note::Model, AppError>(move |txn| {
            Box::pin(async move {
                let existing = find_owned_model(txn, id, owner_id).await?;
                let mut active: note::ActiveModel = existing.into();
                active.title = Set(input.title);
                active.description = Set(input.description);
                active.link = Set(input.link);
                active.is_public = Set(input.is_public);
                active.updated_at = Set(Utc::now());
                let updated = active.update(txn).await?;
                save_tags(txn, id, &input.tags).await?;
                Ok(updated)
            })
        })
        .await
        .map_err(map_tx_error)?;

    debug!("note updated id={}", saved.id);
    single_view(db, saved, Some(owner_id)).await
}

pub async fn delete_note(db: &DatabaseConnection, id: i32, owner_id: i32) -> Result<(), AppError> {
    db.transaction::<_, (), AppError>(move |txn| {
        Box::pin(async move {
            find_owned_model(txn, id, owner_id).await?;
            note_tag::Entity::delete_many()
                .filter(note_tag::Column::NoteId.eq(id))
                .exec(txn)
                .await?;
            user_like::Entity::delete_many()
                .filter(user_like::Column::NoteId.eq(id))
                .exec(txn)
                .await?;
            note::Entity::delete_by_id(id).exec(txn).await?;
            Ok(())
        })
    })
    .await
    .map_err(map_tx_error)?;

    info!("note deleted id={} owner={}", id, owner_id);
    Ok(())
}

async fn save_tags<C: ConnectionTrait>(db: &C, note_id: i32, names: &[String]) -> Result<(), AppError> {
    let resolved = tags::resolve_tags(db, names).await?;
    let ids: Vec<i32> = resolved.iter().map(|t| t.id).collect();
    tags::replace_note_tags(db, note_id, &ids).await
}

async fn list_where<C: ConnectionTrait>(
    db: &C,
    cond: Condition,
    requester: Option<i32>,
    page: PageQuery,
) -> Result<Page<NoteView>, AppError> {
    let offset = page.offset();
    let (_, size) = page.resolve();
    let query = note::Entity::find()
        .filter(cond)
        .order_by_desc(note::Column::CreatedAt)
        .order_by_desc(note::Column::Id);

    let total = query.clone().count(db).await?;
    let rows = query.offset(offset).limit(size).all(db).await?;
    let items = attach(db, rows, requester).await?;
    let total_page = if total % size == 0 { total / size } else { total / size + 1 };
    Ok(Page { items, total, total_page })
}

async fn single_view<C: ConnectionTrait>(
    db: &C,
    model: note::Model,
    requester: Option<i32>,
) -> Result<NoteView, AppError> {
    attach(db, vec![model], requester)
        .await?
        .pop()
        .ok_or_else(AppError::system_exception)
}

async fn attach<C: ConnectionTrait>(
    db: &C,
    notes: Vec<note::Model>,
    requester: Option<i32>,
) -> Result<Vec<NoteView>, AppError> {
    let ids: Vec<i32> = notes.iter().map(|n| n.id).collect();
    let mut tag_map = tags::tags_for_notes(db, &ids).await?;
    let mut like_map = likes::liked_by(db, &ids).await?;

    let owner_ids: HashSet<i32> = notes.iter().map(|n| n.user_id).collect();
    let authors: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(owner_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, display_name(&u)))
        .collect();

    Ok(notes
        .into_iter()
        .map(|n| {
            let liked_by = like_map.remove(&n.id).unwrap_or_default();
            let liked = requester.map(|uid| liked_by.contains(&uid)).unwrap_or(false);
            NoteView {
                id: n.id,
                user_id: n.user_id,
                author_name: authors.get(&n.user_id).cloned().unwrap_or_default(),
                title: n.title,
                description: n.description,
                link: n.link,
                is_public: n.is_public,
                created_at: to_rfc3339(n.created_at),
                updated_at: to_rfc3339(n.updated_at),
                tags: tag_map.remove(&n.id).unwrap_or_default(),
                like_count: liked_by.len(),
                liked_by,
                liked,
            }
        })
        .collect())
}

pub fn display_name(u: &user::Model) -> String {
    u.name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "No name".to_string())
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_defaults_and_clamps() {
        assert_eq!(PageQuery::default().resolve(), (1, DEFAULT_PAGE_SIZE));
        assert_eq!(PageQuery::new(0, 0).resolve(), (1, 1));
        assert_eq!(PageQuery::new(3, 10_000).resolve(), (3, MAX_PAGE_SIZE));
    }

    #[test]
    fn page_offset_saturates() {
        assert_eq!(PageQuery::default().offset(), 0);
        assert_eq!(PageQuery::new(3, 10).offset(), 20);
        assert_eq!(PageQuery::new(u64::MAX, MAX_PAGE_SIZE).offset(), i64::MAX as u64);
    }
}
