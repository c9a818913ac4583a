use thiserror::Error;

/// Main error type for the swarm coordinator
#[derive(Error, Debug)]
pub enum GambitError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Treasury / admission errors
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Reservation conflict on {market_id}/{side}")]
    Conflict { market_id: String, side: String },

    // Strategy errors
    #[error("Strategy timed out: {strategy_id}")]
    StrategyTimeout { strategy_id: String },

    // Order execution errors
    #[error("Order rejected by gateway: {0}")]
    GatewayRejected(String),

    #[error("Gateway network failure: {0}")]
    GatewayNetwork(String),

    #[error("Exchange credentials missing")]
    AuthMissing,

    // Advisory errors
    #[error("Advisory verdict timed out")]
    AdvisoryTimeout,

    #[error("Advisory failure: {0}")]
    Advisory(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Shared state errors
    #[error("State corruption: {0}")]
    StateCorruption(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for GambitError
pub type Result<T> = std::result::Result<T, GambitError>;

/// Specific error types for shared state store mutations
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("insufficient position: requested {requested}, held {held}")]
    InsufficientPosition {
        requested: rust_decimal::Decimal,
        held: rust_decimal::Decimal,
    },

    #[error("conflicting reservation for {market_id}/{side}")]
    Conflict { market_id: String, side: String },

    #[error("unknown reservation: {reservation_id}")]
    UnknownReservation { reservation_id: uuid::Uuid },

    #[error("reservation grow attempted: {from} -> {to}")]
    ReservationGrow {
        from: rust_decimal::Decimal,
        to: rust_decimal::Decimal,
    },

    #[error("state corruption: {0}")]
    Corruption(String),
}

/// Specific error types for order submission
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("rejected: {0}")]
    Rejected(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("credentials missing")]
    AuthMissing,
}

impl From<StoreError> for GambitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientFunds {
                requested,
                available,
            } => GambitError::InsufficientFunds {
                requested,
                available,
            },
            StoreError::InsufficientPosition { requested, held } => {
                GambitError::InsufficientFunds {
                    requested,
                    available: held,
                }
            }
            StoreError::Conflict { market_id, side } => GambitError::Conflict { market_id, side },
            StoreError::Corruption(msg) => GambitError::StateCorruption(msg),
            other => GambitError::Internal(other.to_string()),
        }
    }
}

impl From<GatewayError> for GambitError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(msg) => GambitError::GatewayRejected(msg),
            GatewayError::Network(msg) => GambitError::GatewayNetwork(msg),
            GatewayError::AuthMissing => GambitError::AuthMissing,
        }
    }
}
