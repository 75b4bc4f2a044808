use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One table for the whole chapter/unit/lesson/exercise hierarchy,
/// discriminated by `kind`, instead of four structurally identical schemas.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: String, // 'chapter', 'unit', 'lesson', 'exercise'
    pub language_id: i32,
    /// NULL for chapters; otherwise the id of the enclosing item
    pub parent_id: Option<i32>,
    pub title: String,
    /// Dense per-parent ordering, assigned max(existing)+1 on creation
    pub position: i32,
    pub xp_reward: i64,
    pub gem_reward: i64,
    pub gel_reward: i64,
    pub status: String, // 'active', 'disabled' (soft delete, never removed)
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::language::Entity",
        from = "Column::LanguageId",
        to = "super::language::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Language,
}

impl Related<super::language::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Language.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentItemDto {
    pub kind: String,
    pub language_id: i32,
    pub parent_id: Option<i32>,
    pub title: String,
    pub xp_reward: Option<i64>,
    pub gem_reward: Option<i64>,
    pub gel_reward: Option<i64>,
}
