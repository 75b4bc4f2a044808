pub mod activity_log;
pub mod audit_log;
pub mod completed_item;
pub mod content_item;
pub mod language;
pub mod quest;
pub mod quest_condition;
pub mod user;
pub mod user_progress;
pub mod user_quest;
pub mod user_quest_condition;

pub use content_item::ContentItemDto;
