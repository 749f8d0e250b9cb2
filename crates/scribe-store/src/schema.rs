/// SQL DDL for the scribe-store database.
/// WAL mode + foreign keys enabled at connection time.
pub const SCHEMA_VERSION: u32 = 1;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS chat_sessions (
    id TEXT PRIMARY KEY,
    title TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_messages (
    id TEXT PRIMARY KEY,
    chat_session_id TEXT NOT NULL REFERENCES chat_sessions(id),
    role TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    citation_map TEXT,
    token_count INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_documents (
    row_id INTEGER PRIMARY KEY,
    document_id TEXT NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    content TEXT NOT NULL,
    score REAL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS message_documents (
    message_id TEXT NOT NULL REFERENCES chat_messages(id),
    document_row_id INTEGER NOT NULL REFERENCES search_documents(row_id),
    rank INTEGER NOT NULL,
    PRIMARY KEY (message_id, document_row_id)
);

CREATE TABLE IF NOT EXISTS iterations (
    id INTEGER PRIMARY KEY,
    message_id TEXT NOT NULL REFERENCES chat_messages(id),
    iteration_nr INTEGER NOT NULL,
    plan TEXT NOT NULL,
    purpose TEXT NOT NULL,
    reasoning TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS iteration_sub_steps (
    id INTEGER PRIMARY KEY,
    message_id TEXT NOT NULL REFERENCES chat_messages(id),
    iteration_nr INTEGER NOT NULL,
    parallelization_nr INTEGER NOT NULL,
    tool_name TEXT NOT NULL,
    tool_id TEXT NOT NULL,
    question TEXT NOT NULL,
    reasoning TEXT NOT NULL,
    answer TEXT NOT NULL,
    cited_documents TEXT NOT NULL,
    generated_images TEXT NOT NULL,
    file_ids TEXT,
    response_type TEXT,
    additional_data TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_session ON chat_messages(chat_session_id);
CREATE INDEX IF NOT EXISTS idx_message_documents_message ON message_documents(message_id);
CREATE INDEX IF NOT EXISTS idx_iterations_message ON iterations(message_id);
CREATE INDEX IF NOT EXISTS idx_sub_steps_message ON iteration_sub_steps(message_id);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
PRAGMA synchronous = NORMAL;
"#;
