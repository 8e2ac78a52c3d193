//! API constants

/// Prefix shared by every JSON route
pub const API_PREFIX: &str = "/api";

/// Name of the HttpOnly cookie carrying the session JWT
pub const SESSION_COOKIE: &str = "session";

/// Lifetime of presigned URLs handed to Slack and other integrations
pub const PRESIGNED_URL_TTL_SECS: u64 = 3600;

/// Lifetime of a signed Google OAuth `state` parameter
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

/// Edge length of Slack color swatches, in pixels
pub const SWATCH_SIZE: u32 = 64;

/// Buffered Drive import events before the importer waits for the client
pub const IMPORT_EVENT_BUFFER: usize = 32;
