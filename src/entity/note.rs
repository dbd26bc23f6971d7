use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "t_note")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owner. Written once on insert.
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub link: String,
    pub is_public: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
