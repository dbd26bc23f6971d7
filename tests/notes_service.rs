mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use studynotes::entity::user_like::LikeStatus;
use studynotes::entity::{note_tag, tag, user_like};
use studynotes::error::AppError;
use studynotes::forms::NoteForm;
use studynotes::likes;
use studynotes::notes::{self, PageQuery};

use common::{active_user, memory_db, note_input};

#[actix_rt::test]
async fn owner_listing_only_contains_own_notes() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;

    notes::create_note(&db, alice.id, note_input("a1", false, &[])).await.unwrap();
    notes::create_note(&db, alice.id, note_input("a2", true, &[])).await.unwrap();
    notes::create_note(&db, bob.id, note_input("b1", true, &[])).await.unwrap();

    let mine = notes::list_by_owner(&db, alice.id, PageQuery::default()).await.unwrap();
    assert_eq!(mine.total, 2);
    assert!(mine.items.iter().all(|n| n.user_id == alice.id));
    // newest first
    assert_eq!(mine.items[0].title, "a2");
}

#[actix_rt::test]
async fn public_listing_is_exactly_the_public_notes() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;

    notes::create_note(&db, alice.id, note_input("private", false, &[])).await.unwrap();
    notes::create_note(&db, alice.id, note_input("open", true, &[])).await.unwrap();
    notes::create_note(&db, bob.id, note_input("bob open", true, &[])).await.unwrap();

    for requester in [None, Some(alice.id), Some(bob.id)] {
        let page = notes::list_public(&db, requester, PageQuery::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|n| n.is_public));
    }
    assert_eq!(notes::count_public(&db).await.unwrap(), 2);

    let paged = notes::list_public(&db, None, PageQuery::new(2, 1)).await.unwrap();
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.total_page, 2);
}

#[actix_rt::test]
async fn private_note_hidden_from_everyone_but_owner() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let secret = notes::create_note(&db, alice.id, note_input("secret", false, &[])).await.unwrap();

    let own = notes::find_visible(&db, secret.id, Some(alice.id)).await.unwrap();
    assert_eq!(own.author_name, "Alice");

    let err = notes::find_visible(&db, secret.id, Some(bob.id)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = notes::find_visible(&db, secret.id, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = notes::find_visible(&db, 9999, Some(alice.id)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
}

#[actix_rt::test]
async fn tags_are_normalized_and_deduplicated() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;

    let input = NoteForm {
        title: Some("Joins".to_string()),
        description: Some("inner vs outer".to_string()),
        tags: Some(vec!["  SQL ".to_string(), "sql".to_string(), "Python".to_string()]),
        ..Default::default()
    }
    .clean()
    .unwrap();
    let created = notes::create_note(&db, alice.id, input).await.unwrap();

    assert_eq!(created.tags, vec!["python", "sql"]);
    assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 2);
}

#[actix_rt::test]
async fn update_replaces_tag_set_and_keeps_orphan_tags() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let created = notes::create_note(&db, alice.id, note_input("n", true, &["rust", "sql"])).await.unwrap();

    let updated = notes::update_note(&db, created.id, alice.id, note_input("n2", false, &["go", "rust"]))
        .await
        .unwrap();
    assert_eq!(updated.title, "n2");
    assert!(!updated.is_public);
    assert_eq!(updated.tags, vec!["go", "rust"]);

    let reread = notes::find_owned(&db, created.id, alice.id).await.unwrap();
    assert_eq!(reread.tags, vec!["go", "rust"]);

    let orphan = tag::Entity::find()
        .filter(tag::Column::Tag.eq("sql"))
        .one(&db)
        .await
        .unwrap();
    assert!(orphan.is_some());

    let cleared = notes::update_note(&db, created.id, alice.id, note_input("n3", false, &[])).await.unwrap();
    assert!(cleared.tags.is_empty());
}

#[actix_rt::test]
async fn strangers_cannot_edit_or_delete() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let public = notes::create_note(&db, alice.id, note_input("open", true, &[])).await.unwrap();

    let err = notes::update_note(&db, public.id, bob.id, note_input("hijack", true, &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let err = notes::delete_note(&db, public.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let still = notes::find_visible(&db, public.id, None).await.unwrap();
    assert_eq!(still.title, "open");
}

#[actix_rt::test]
async fn like_toggle_twice_restores_state() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let note = notes::create_note(&db, alice.id, note_input("open", true, &[])).await.unwrap();

    let first = likes::toggle_like(&db, note.id, bob.id).await.unwrap();
    assert!(first.liked);
    assert_eq!(first.like_count, 1);

    let view = notes::find_visible(&db, note.id, Some(bob.id)).await.unwrap();
    assert_eq!(view.liked_by, vec![bob.id]);
    assert!(view.liked);

    let second = likes::toggle_like(&db, note.id, bob.id).await.unwrap();
    assert!(!second.liked);
    assert_eq!(second.like_count, 0);

    let view = notes::find_visible(&db, note.id, Some(bob.id)).await.unwrap();
    assert!(view.liked_by.is_empty());
    assert_eq!(view.like_count, 0);
    assert_eq!(user_like::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn cannot_like_a_note_you_cannot_see() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let secret = notes::create_note(&db, alice.id, note_input("secret", false, &[])).await.unwrap();

    let err = likes::toggle_like(&db, secret.id, bob.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    assert_eq!(likes::like_status(&db, secret.id, bob.id).await.unwrap(), None);

    let own = likes::toggle_like(&db, secret.id, alice.id).await.unwrap();
    assert!(own.liked);
}

#[actix_rt::test]
async fn delete_removes_tag_links_and_likes() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let note = notes::create_note(&db, alice.id, note_input("gone", true, &["rust"])).await.unwrap();
    likes::toggle_like(&db, note.id, bob.id).await.unwrap();

    notes::delete_note(&db, note.id, alice.id).await.unwrap();

    let err = notes::find_visible(&db, note.id, Some(alice.id)).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    let links = note_tag::Entity::find()
        .filter(note_tag::Column::NoteId.eq(note.id))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(links, 0);
    assert_eq!(user_like::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(tag::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn concurrent_toggles_do_not_lose_updates() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;
    let note = notes::create_note(&db, alice.id, note_input("open", true, &[])).await.unwrap();

    let (a, b) = futures_util::future::join(
        likes::toggle_like(&db, note.id, bob.id),
        likes::toggle_like(&db, note.id, bob.id),
    )
    .await;
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.liked, b.liked);
    assert_eq!(a.like_count + b.like_count, 1);

    assert_eq!(likes::like_status(&db, note.id, bob.id).await.unwrap(), Some(LikeStatus::Unlike));
    assert_eq!(user_like::Entity::find().count(&db).await.unwrap(), 1);
}

#[actix_rt::test]
async fn shared_tags_reuse_one_row() {
    let db = memory_db().await;
    let alice = active_user(&db, "alice@example.com", "Alice").await;
    let bob = active_user(&db, "bob@example.com", "Bob").await;

    let first = notes::create_note(&db, alice.id, note_input("a", true, &["rust"])).await.unwrap();
    let second = notes::create_note(&db, bob.id, note_input("b", true, &["rust", "async"])).await.unwrap();
    assert_eq!(first.tags, vec!["rust"]);
    assert_eq!(second.tags, vec!["async", "rust"]);

    let rust_rows = tag::Entity::find()
        .filter(tag::Column::Tag.eq("rust"))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(rust_rows, 1);
}
