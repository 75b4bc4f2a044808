//! Content hierarchy management (admin side).
//!
//! All four item kinds share one table, one validator and one creation path;
//! the `kind` discriminant plus `parent_kind()` enforce the
//! language -> chapter -> unit -> lesson -> exercise shape.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::{ContentKind, ContentStatus, LedgerError};
use crate::models::content_item::{self, ContentItemDto};
use crate::models::language;

pub async fn create_language(
    db: &DatabaseConnection,
    code: &str,
    name: &str,
) -> Result<language::Model, LedgerError> {
    if code.trim().is_empty() || name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "code and name are required".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let model = language::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.trim().to_string()),
        status: Set(ContentStatus::Active.as_str().to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    model
        .insert(db)
        .await
        .map_err(|e| match crate::domain::is_unique_violation(&e) {
            true => LedgerError::Validation(format!("language code '{}' already exists", code)),
            false => e.into(),
        })
}

/// The shared validator for every item kind.
async fn validate_dto(
    db: &DatabaseConnection,
    dto: &ContentItemDto,
) -> Result<ContentKind, LedgerError> {
    let kind = ContentKind::parse(&dto.kind)?;

    if dto.title.trim().is_empty() {
        return Err(LedgerError::Validation("title is required".to_string()));
    }
    for (name, value) in [
        ("xp_reward", dto.xp_reward),
        ("gem_reward", dto.gem_reward),
        ("gel_reward", dto.gel_reward),
    ] {
        if value.unwrap_or(0) < 0 {
            return Err(LedgerError::Validation(format!(
                "{} must be non-negative",
                name
            )));
        }
    }

    language::Entity::find_by_id(dto.language_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound)?;

    match (kind.parent_kind(), dto.parent_id) {
        (None, Some(_)) => {
            return Err(LedgerError::Validation(
                "chapters cannot have a parent".to_string(),
            ));
        }
        (None, None) => {}
        (Some(_), None) => {
            return Err(LedgerError::Validation(format!(
                "{} requires a parent_id",
                kind.as_str()
            )));
        }
        (Some(expected), Some(parent_id)) => {
            let parent = content_item::Entity::find_by_id(parent_id)
                .one(db)
                .await?
                .ok_or(LedgerError::NotFound)?;
            if parent.kind != expected.as_str() {
                return Err(LedgerError::Validation(format!(
                    "parent of a {} must be a {}, got {}",
                    kind.as_str(),
                    expected.as_str(),
                    parent.kind
                )));
            }
            if parent.language_id != dto.language_id {
                return Err(LedgerError::Validation(
                    "parent belongs to a different language".to_string(),
                ));
            }
        }
    }

    Ok(kind)
}

/// Creates a content item with `position = max(existing sibling) + 1`.
pub async fn create_item(
    db: &DatabaseConnection,
    dto: ContentItemDto,
) -> Result<content_item::Model, LedgerError> {
    let kind = validate_dto(db, &dto).await?;

    let txn = db.begin().await?;

    let mut siblings = content_item::Entity::find()
        .filter(content_item::Column::LanguageId.eq(dto.language_id))
        .filter(content_item::Column::Kind.eq(kind.as_str()));
    siblings = match dto.parent_id {
        Some(parent_id) => siblings.filter(content_item::Column::ParentId.eq(parent_id)),
        None => siblings.filter(content_item::Column::ParentId.is_null()),
    };
    let last = siblings
        .order_by_desc(content_item::Column::Position)
        .one(&txn)
        .await?;
    let position = last.map(|s| s.position + 1).unwrap_or(1);

    let now = Utc::now().to_rfc3339();
    let model = content_item::ActiveModel {
        kind: Set(kind.as_str().to_string()),
        language_id: Set(dto.language_id),
        parent_id: Set(dto.parent_id),
        title: Set(dto.title.trim().to_string()),
        position: Set(position),
        xp_reward: Set(dto.xp_reward.unwrap_or(0)),
        gem_reward: Set(dto.gem_reward.unwrap_or(0)),
        gel_reward: Set(dto.gel_reward.unwrap_or(0)),
        status: Set(ContentStatus::Active.as_str().to_string()),
        version: Set(1),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(&txn).await?;
    txn.commit().await?;
    Ok(created)
}

/// Soft-disable instead of delete; the item stays referenceable by completed
/// records. Bumps the version.
pub async fn disable_item(
    db: &DatabaseConnection,
    item_id: i32,
) -> Result<content_item::Model, LedgerError> {
    let item = content_item::Entity::find_by_id(item_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound)?;

    if ContentStatus::parse(&item.status)? == ContentStatus::Disabled {
        return Ok(item);
    }

    let version = item.version + 1;
    let mut active: content_item::ActiveModel = item.into();
    active.status = Set(ContentStatus::Disabled.as_str().to_string());
    active.version = Set(version);
    active.updated_at = Set(Utc::now().to_rfc3339());
    Ok(active.update(db).await?)
}

/// Active items of a language ordered by kind hierarchy and position;
/// the handler shapes this into a nested tree for the client.
pub async fn language_items(
    db: &DatabaseConnection,
    language_id: i32,
) -> Result<Vec<content_item::Model>, LedgerError> {
    language::Entity::find_by_id(language_id)
        .one(db)
        .await?
        .ok_or(LedgerError::NotFound)?;

    Ok(content_item::Entity::find()
        .filter(content_item::Column::LanguageId.eq(language_id))
        .filter(content_item::Column::Status.eq(ContentStatus::Active.as_str()))
        .order_by_asc(content_item::Column::Position)
        .all(db)
        .await?)
}
