use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-(user, language) progress document. Created lazily on first
/// "start learning" and never hard-deleted (admin reset only clears fields).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_progress")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub language_id: i32,
    pub current_lesson_id: Option<i32>,
    pub current_lesson_progress: f64, // 0.0..=1.0
    pub current_lesson_accessed_at: Option<String>,
    /// JSON map over the fixed value-point key set, merged by addition
    pub value_points: String,
    pub archived: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::language::Entity",
        from = "Column::LanguageId",
        to = "super::language::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Language,
    #[sea_orm(has_many = "super::completed_item::Entity")]
    CompletedItem,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::language::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Language.def()
    }
}

impl Related<super::completed_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompletedItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
