use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Counter state for one condition of one user quest.
///
/// `window_start` holds the user-local start date of the current counting
/// window for daily/weekly/monthly timeframes; when the window rolls over the
/// counter resets before the next increment lands.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_quest_conditions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_quest_id: i32,
    pub condition_id: i32,
    pub counter: i64,
    pub window_start: String, // ISO date, '' for total/session
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user_quest::Entity",
        from = "Column::UserQuestId",
        to = "super::user_quest::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UserQuest,
    #[sea_orm(
        belongs_to = "super::quest_condition::Entity",
        from = "Column::ConditionId",
        to = "super::quest_condition::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    QuestCondition,
}

impl Related<super::user_quest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserQuest.def()
    }
}

impl Related<super::quest_condition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestCondition.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
