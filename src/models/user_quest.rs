use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user quest assignment. `status` moves forward only; `completed_at` is
/// set exactly once and never touched again.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_quests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub quest_id: i32,
    pub status: String, // 'assigned', 'started', 'in_progress', 'completed', 'abandoned', 'expired'
    pub overall_progress: i32, // 0..=100
    pub assigned_at: String,
    pub completed_at: Option<String>,
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
        belongs_to = "super::quest::Entity",
        from = "Column::QuestId",
        to = "super::quest::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Quest,
    #[sea_orm(has_many = "super::user_quest_condition::Entity")]
    UserQuestCondition,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::quest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quest.def()
    }
}

impl Related<super::user_quest_condition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserQuestCondition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
