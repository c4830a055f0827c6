/// Stable record identifier derived from record content (used as the score-cache key).
/// Example: `google_news::9f2c44a01b7e3d55`
pub type RecordId = String;
/// Identifier for the dataset a record was loaded from.
/// Examples: `google_news`, `social_searcher`
pub type SourceId = String;
/// Human-readable source label shown by the dashboard.
/// Examples: `Google News`, `Social Searcher`
pub type SourceLabel = String;
/// Column name inside a raw record.
/// Examples: `publishedAt`, `posted`, `description`, `source.name`
pub type FieldName = String;
/// Keyword typed into the dashboard search box.
/// Examples: `crypto`, `Acme Corp`
pub type Keyword = String;
/// Warning/log message text surfaced to the analyst.
/// Examples: `alert dispatch failed: outbox directory is read-only`
pub type LogMessage = String;
/// Components used to build record identity hashes.
/// Example: `google_news|2024-01-01T00:00:00Z|Markets rally|https://example.com/a`
pub type HashPart = String;
