use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    pub gem_reward: i64,
    pub gel_reward: i64,
    pub status: String, // 'active', 'disabled'
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::quest_condition::Entity")]
    QuestCondition,
    #[sea_orm(has_many = "super::user_quest::Entity")]
    UserQuest,
}

impl Related<super::quest_condition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestCondition.def()
    }
}

impl Related<super::user_quest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserQuest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
