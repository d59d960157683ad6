pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS games (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS platforms (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- DLCs, editions and other additions (catalog data)
CREATE TABLE IF NOT EXISTS game_additions (
    id TEXT PRIMARY KEY,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 1 CHECK (weight > 0),
    required_for_full INTEGER NOT NULL DEFAULT 0,
    addition_type TEXT NOT NULL CHECK (addition_type IN ('dlc', 'edition', 'other')),
    is_complete_edition INTEGER NOT NULL DEFAULT 0
);

-- Which edition variant a user owns
CREATE TABLE IF NOT EXISTS user_game_editions (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    platform_id TEXT NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
    edition_id TEXT REFERENCES game_additions(id) ON DELETE SET NULL,
    PRIMARY KEY (user_id, game_id, platform_id)
);

-- Explicit per-addition ownership
CREATE TABLE IF NOT EXISTS user_game_additions (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    platform_id TEXT NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
    addition_id TEXT NOT NULL REFERENCES game_additions(id) ON DELETE CASCADE,
    owned INTEGER NOT NULL DEFAULT 1,
    PRIMARY KEY (user_id, game_id, platform_id, addition_id)
);

-- One row per library entry; written with an upsert
CREATE TABLE IF NOT EXISTS user_game_progress (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    platform_id TEXT NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'backlog',
    completion_percentage INTEGER NOT NULL DEFAULT 0,
    started_at TEXT,
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, game_id, platform_id)
);

-- Append-only completion history. Rows are never updated.
CREATE TABLE IF NOT EXISTS completion_logs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    platform_id TEXT NOT NULL REFERENCES platforms(id) ON DELETE CASCADE,
    completion_type TEXT NOT NULL CHECK (completion_type IN ('main', 'dlc', 'full', 'completionist')),
    dlc_id TEXT REFERENCES game_additions(id) ON DELETE CASCADE,
    percentage INTEGER NOT NULL CHECK (percentage BETWEEN 0 AND 100),
    logged_at TEXT NOT NULL,
    notes TEXT,
    CHECK ((completion_type = 'dlc') = (dlc_id IS NOT NULL))
);

-- Achievement aggregates fed by the external integrations
CREATE TABLE IF NOT EXISTS achievement_totals (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    game_id TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    total INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, game_id)
);

CREATE INDEX IF NOT EXISTS idx_game_additions_game ON game_additions(game_id);
CREATE INDEX IF NOT EXISTS idx_completion_logs_key
    ON completion_logs(user_id, game_id, platform_id, completion_type, dlc_id, logged_at);
"#;
