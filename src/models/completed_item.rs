use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Immutable reward records, one per completed item per progress document.
///
/// UNIQUE(progress_id, item_kind, item_id) is the idempotency guard: a second
/// insert for the same item fails the constraint and the operation becomes a
/// no-op returning the first record.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "completed_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub progress_id: i32,
    pub item_kind: String, // 'chapter', 'unit', 'lesson', 'exercise'
    pub item_id: i32,
    pub xp: i64,
    pub gems: i64,
    pub gel: i64,
    /// Multiplier actually applied at credit time, if a boost was active
    pub boost_multiplier: Option<f64>,
    pub completed_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user_progress::Entity",
        from = "Column::ProgressId",
        to = "super::user_progress::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UserProgress,
}

impl Related<super::user_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
