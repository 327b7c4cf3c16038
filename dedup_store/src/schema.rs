pub const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS files (
    path            TEXT PRIMARY KEY,
    content_hash    TEXT NOT NULL,
    size            INTEGER NOT NULL,
    created_at      INTEGER NOT NULL,
    modified_at     INTEGER NOT NULL,
    width           INTEGER,
    height          INTEGER,
    gps_lat         REAL,
    gps_lon         REAL,
    camera_model    TEXT,
    image_date      INTEGER,
    media_duration  REAL NOT NULL,
    p_hash          TEXT,
    lsh1            TEXT,
    lsh2            TEXT,
    lsh3            TEXT,
    lsh4            TEXT
)";

pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_files_content_hash ON files(content_hash)",
    "CREATE INDEX IF NOT EXISTS idx_files_p_hash ON files(p_hash)",
    "CREATE INDEX IF NOT EXISTS idx_files_size ON files(size)",
    "CREATE INDEX IF NOT EXISTS idx_files_lsh1 ON files(lsh1)",
    "CREATE INDEX IF NOT EXISTS idx_files_lsh2 ON files(lsh2)",
    "CREATE INDEX IF NOT EXISTS idx_files_lsh3 ON files(lsh3)",
    "CREATE INDEX IF NOT EXISTS idx_files_lsh4 ON files(lsh4)",
];
