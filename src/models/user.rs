use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Subject claim from the external identity provider
    pub external_id: String,
    pub username: String,
    pub role: String, // 'user', 'admin'
    pub xp: i64,
    pub gems: i64,
    pub gel: i64,
    pub hearts: i32,
    pub max_hearts: i32,
    pub last_heart_regen_at: String,
    pub streak: i32,
    /// Minutes east of UTC, used for streak and quest day boundaries
    pub timezone_offset_minutes: i32,
    pub xp_boost_multiplier: Option<f64>,
    pub xp_boost_granted_at: Option<String>,
    pub xp_boost_duration_minutes: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_progress::Entity")]
    UserProgress,
    #[sea_orm(has_many = "super::user_quest::Entity")]
    UserQuest,
    #[sea_orm(has_many = "super::activity_log::Entity")]
    ActivityLog,
}

impl Related<super::user_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProgress.def()
    }
}

impl Related<super::user_quest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserQuest.def()
    }
}

impl Related<super::activity_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActivityLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
