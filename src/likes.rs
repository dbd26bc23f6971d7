use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;

use crate::entity::user_like::{self, LikeStatus};
use crate::error::{map_tx_error, AppError};
use crate::notes;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub note_id: i32,
    /// Whether the acting user is in the liked-by set after the call.
    pub liked: bool,
    pub like_count: u64,
}

/// Flips the acting user's membership in the note's liked-by set.
///
/// The like row for (note, user) is created on first use and flipped between
/// `Like` and `Unlike` afterwards. The note must be visible to the user.
pub async fn toggle_like(db: &DatabaseConnection, note_id: i32, user_id: i32) -> Result<LikeState, AppError> {
    let state = db
        .transaction::<_, LikeState, AppError>(move |txn| {
            Box::pin(async move {
                notes::find_visible_model(txn, note_id, Some(user_id)).await?;

                let now = Utc::now();
                let liked = match locked_row(txn, note_id, user_id).await? {
                    Some(row) => flip(txn, row, now).await?,
                    None => {
                        let inserted = user_like::ActiveModel {
                            note_id: Set(note_id),
                            user_id: Set(user_id),
                            status: Set(LikeStatus::Like),
                            created: Set(Some(now)),
                            updated: Set(Some(now)),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await;
                        match inserted {
                            Ok(_) => true,
                            Err(err) => {
                                // a concurrent first toggle created the row
                                warn!("like insert failed note={} user={} err={}", note_id, user_id, err);
                                let row = locked_row(txn, note_id, user_id)
                                    .await?
                                    .ok_or_else(AppError::system_exception)?;
                                flip(txn, row, now).await?
                            }
                        }
                    }
                };

                let like_count = user_like::Entity::find()
                    .filter(user_like::Column::NoteId.eq(note_id))
                    .filter(user_like::Column::Status.eq(LikeStatus::Like))
                    .count(txn)
                    .await?;

                Ok(LikeState { note_id, liked, like_count })
            })
        })
        .await
        .map_err(map_tx_error)?;

    debug!("like toggled note={} user={} liked={}", note_id, user_id, state.liked);
    Ok(state)
}

/// The (note, user) row, read `FOR UPDATE` so concurrent toggles serialize.
async fn locked_row<C: ConnectionTrait>(
    db: &C,
    note_id: i32,
    user_id: i32,
) -> Result<Option<user_like::Model>, AppError> {
    Ok(user_like::Entity::find()
        .filter(user_like::Column::NoteId.eq(note_id))
        .filter(user_like::Column::UserId.eq(user_id))
        .lock_exclusive()
        .one(db)
        .await?)
}

/// Flips a stored status and returns whether the user now likes the note.
async fn flip<C: ConnectionTrait>(db: &C, row: user_like::Model, now: DateTime<Utc>) -> Result<bool, AppError> {
    let next = match row.status {
        LikeStatus::Like => LikeStatus::Unlike,
        LikeStatus::Unlike => LikeStatus::Like,
    };
    let mut active: user_like::ActiveModel = row.into();
    active.status = Set(next);
    active.updated = Set(Some(now));
    active.update(db).await?;
    Ok(next == LikeStatus::Like)
}

/// Liked-by sets keyed by note id. Users appear in ascending id order.
pub async fn liked_by<C: ConnectionTrait>(db: &C, note_ids: &[i32]) -> Result<HashMap<i32, Vec<i32>>, AppError> {
    let mut out: HashMap<i32, Vec<i32>> = HashMap::new();
    if note_ids.is_empty() {
        return Ok(out);
    }
    let rows = user_like::Entity::find()
        .filter(user_like::Column::NoteId.is_in(note_ids.iter().copied()))
        .filter(user_like::Column::Status.eq(LikeStatus::Like))
        .order_by_asc(user_like::Column::UserId)
        .all(db)
        .await?;
    for row in rows {
        out.entry(row.note_id).or_default().push(row.user_id);
    }
    Ok(out)
}

/// Stored status for (note, user), `None` before the first toggle.
pub async fn like_status<C: ConnectionTrait>(
    db: &C,
    note_id: i32,
    user_id: i32,
) -> Result<Option<LikeStatus>, AppError> {
    let row = user_like::Entity::find()
        .filter(user_like::Column::NoteId.eq(note_id))
        .filter(user_like::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(row.map(|r| r.status))
}
