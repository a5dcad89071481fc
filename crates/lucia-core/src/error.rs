// Closed error taxonomy for the session/key lifecycle engine.
//
// Every public operation fails with exactly one of these kinds so callers
// (framework shims, CLIs) can match on the variant and pick a response.
// Storage errors that are not one of the recognized conditions travel
// through `Database` untouched; they are never swallowed or retried here.

/// Error kinds surfaced by the auth engine and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum LuciaError {
    /// Session lookup found nothing, or the session is past its idle expiry.
    /// A dead session and an unknown id are deliberately indistinguishable.
    #[error("Invalid session id")]
    InvalidSessionId,

    /// Key lookup found nothing.
    #[error("Invalid key id")]
    InvalidKeyId,

    /// The key exists but the password check failed, or password presence
    /// did not match between the stored key and the caller.
    #[error("Invalid password")]
    InvalidPassword,

    /// The stored hash uses a retired format that is no longer verified.
    /// The caller must force a password reset.
    #[error("Outdated password hash")]
    OutdatedPassword,

    /// The adapter reported a uniqueness violation on session insert.
    #[error("Duplicate session id")]
    DuplicateSessionId,

    /// The adapter reported a uniqueness violation on key insert.
    #[error("Duplicate key id")]
    DuplicateKeyId,

    /// User lookup found nothing, or an insert referenced a missing user.
    #[error("Invalid user id")]
    InvalidUserId,

    /// Missing or mismatched origin on a state-changing request.
    #[error("Invalid request origin")]
    InvalidRequest,

    /// The adapter's backend cannot mint ids and the caller did not supply
    /// one. Only raised by adapter implementations.
    #[error("Database does not support auto user id generation")]
    AutoIdGenerationNotSupported,

    /// Unmapped storage/backend failure, propagated as-is.
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl LuciaError {
    /// Stable machine-readable tag, unchanged across releases. Shims that
    /// serialize errors over a process boundary key on these strings.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSessionId => "AUTH_INVALID_SESSION_ID",
            Self::InvalidKeyId => "AUTH_INVALID_KEY_ID",
            Self::InvalidPassword => "AUTH_INVALID_PASSWORD",
            Self::OutdatedPassword => "AUTH_OUTDATED_PASSWORD",
            Self::DuplicateSessionId => "AUTH_DUPLICATE_SESSION_ID",
            Self::DuplicateKeyId => "AUTH_DUPLICATE_KEY_ID",
            Self::InvalidUserId => "AUTH_INVALID_USER_ID",
            Self::InvalidRequest => "AUTH_INVALID_REQUEST",
            Self::AutoIdGenerationNotSupported => "AUTO_USER_ID_GENERATION_NOT_SUPPORTED",
            Self::Database(_) => "UNKNOWN_ERROR",
        }
    }
}

/// Unified result type for lucia operations.
pub type Result<T> = std::result::Result<T, LuciaError>;
