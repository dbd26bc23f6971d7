pub mod note;
pub mod note_tag;
pub mod tag;
pub mod user;
pub mod user_like;
