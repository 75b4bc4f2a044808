use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "quest_conditions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub quest_id: i32,
    pub condition_type: String, // e.g. 'complete_lessons', 'earn_xp'
    pub target: i64,
    pub timeframe: String, // 'daily', 'weekly', 'monthly', 'total', 'session'
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quest::Entity",
        from = "Column::QuestId",
        to = "super::quest::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Quest,
}

impl Related<super::quest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
