use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Create users table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            xp INTEGER NOT NULL DEFAULT 0,
            gems INTEGER NOT NULL DEFAULT 0,
            gel INTEGER NOT NULL DEFAULT 0,
            hearts INTEGER NOT NULL DEFAULT 5,
            max_hearts INTEGER NOT NULL DEFAULT 5,
            last_heart_regen_at TEXT NOT NULL DEFAULT '',
            streak INTEGER NOT NULL DEFAULT 0,
            timezone_offset_minutes INTEGER NOT NULL DEFAULT 0,
            xp_boost_multiplier REAL,
            xp_boost_granted_at TEXT,
            xp_boost_duration_minutes INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create languages table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS languages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Create content_items table (single table for chapter/unit/lesson/exercise)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS content_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            language_id INTEGER NOT NULL,
            parent_id INTEGER,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            xp_reward INTEGER NOT NULL DEFAULT 0,
            gem_reward INTEGER NOT NULL DEFAULT 0,
            gel_reward INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            version INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE,
            FOREIGN KEY (parent_id) REFERENCES content_items(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_content_items_language ON content_items(language_id);
        CREATE INDEX IF NOT EXISTS idx_content_items_parent ON content_items(parent_id);
        CREATE INDEX IF NOT EXISTS idx_content_items_kind ON content_items(kind);
        "#
        .to_owned(),
    ))
    .await?;

    // Create user_progress table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS user_progress (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            language_id INTEGER NOT NULL,
            current_lesson_id INTEGER,
            current_lesson_progress REAL NOT NULL DEFAULT 0,
            current_lesson_accessed_at TEXT,
            value_points TEXT NOT NULL DEFAULT '{}',
            archived INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, language_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (language_id) REFERENCES languages(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_user_progress_user ON user_progress(user_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create completed_items table.
    // The UNIQUE index is the idempotency guard for reward crediting: a second
    // insert for the same (progress, kind, item) fails and becomes a no-op.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS completed_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            progress_id INTEGER NOT NULL,
            item_kind TEXT NOT NULL,
            item_id INTEGER NOT NULL,
            xp INTEGER NOT NULL DEFAULT 0,
            gems INTEGER NOT NULL DEFAULT 0,
            gel INTEGER NOT NULL DEFAULT 0,
            boost_multiplier REAL,
            completed_at TEXT NOT NULL,
            UNIQUE(progress_id, item_kind, item_id),
            FOREIGN KEY (progress_id) REFERENCES user_progress(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_completed_items_progress ON completed_items(progress_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create quests + quest_conditions tables
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS quests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            xp_reward INTEGER NOT NULL DEFAULT 0,
            gem_reward INTEGER NOT NULL DEFAULT 0,
            gel_reward INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS quest_conditions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            quest_id INTEGER NOT NULL,
            condition_type TEXT NOT NULL,
            target INTEGER NOT NULL,
            timeframe TEXT NOT NULL DEFAULT 'total',
            FOREIGN KEY (quest_id) REFERENCES quests(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_quest_conditions_quest ON quest_conditions(quest_id);
        CREATE INDEX IF NOT EXISTS idx_quest_conditions_type ON quest_conditions(condition_type);
        "#
        .to_owned(),
    ))
    .await?;

    // Create user_quests + user_quest_conditions tables
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS user_quests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            quest_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'assigned',
            overall_progress INTEGER NOT NULL DEFAULT 0,
            assigned_at TEXT NOT NULL,
            completed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(user_id, quest_id),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY (quest_id) REFERENCES quests(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_user_quests_user ON user_quests(user_id);
        CREATE INDEX IF NOT EXISTS idx_user_quests_status ON user_quests(status);
        "#
        .to_owned(),
    ))
    .await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS user_quest_conditions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_quest_id INTEGER NOT NULL,
            condition_id INTEGER NOT NULL,
            counter INTEGER NOT NULL DEFAULT 0,
            window_start TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL,
            UNIQUE(user_quest_id, condition_id),
            FOREIGN KEY (user_quest_id) REFERENCES user_quests(id) ON DELETE CASCADE,
            FOREIGN KEY (condition_id) REFERENCES quest_conditions(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_uqc_user_quest ON user_quest_conditions(user_quest_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Create activity_log table (append-only, feeds the streak tracker)
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS activity_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            occurred_at TEXT NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_activity_log_user ON activity_log(user_id);
        CREATE INDEX IF NOT EXISTS idx_activity_log_kind ON activity_log(kind);
        "#
        .to_owned(),
    ))
    .await?;

    // Create audit_log table
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            subject_user_id INTEGER NOT NULL,
            before_state TEXT,
            after_state TEXT,
            reason TEXT NOT NULL,
            outcome TEXT NOT NULL DEFAULT 'ok',
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_subject ON audit_log(subject_user_id);
        "#
        .to_owned(),
    ))
    .await?;

    // Migration: add gel to users for databases created before the gel economy
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE users ADD COLUMN gel INTEGER NOT NULL DEFAULT 0".to_owned(),
        ))
        .await;

    // Migration: add timezone offset (streak day boundaries are user-local)
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE users ADD COLUMN timezone_offset_minutes INTEGER NOT NULL DEFAULT 0"
                .to_owned(),
        ))
        .await;

    // Migration: add version to content_items
    let _ = db
        .execute(Statement::from_string(
            db.get_database_backend(),
            "ALTER TABLE content_items ADD COLUMN version INTEGER NOT NULL DEFAULT 1".to_owned(),
        ))
        .await;

    Ok(())
}
