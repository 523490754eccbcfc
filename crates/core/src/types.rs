/// Opaque job identifier. Uniqueness is the creator's responsibility.
pub type JobId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
