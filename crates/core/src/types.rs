/// Primary key type shared by every table (`BIGSERIAL`).
pub type DbId = i64;

/// All timestamps are stored and exchanged as UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
