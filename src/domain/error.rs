//! Domain error types.

/// Top-level error type for stocksim.
#[derive(Debug, thiserror::Error)]
pub enum StocksimError {
    #[error("invalid symbol {symbol:?}: {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("quantity must be a positive integer, got {qty}")]
    InvalidQuantity { qty: i64 },

    #[error("price must be a positive finite number, got {price}")]
    InvalidPrice { price: f64 },

    #[error("invalid duration of {days} day(s): {reason}")]
    InvalidDuration { days: i64, reason: String },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("unknown symbol: {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("symbol already exists: {symbol}")]
    DuplicateSymbol { symbol: String },

    #[error("not enough cash: need {required:.2}, have {available:.2}")]
    InsufficientCash { required: f64, available: f64 },

    #[error("not enough shares of {symbol} to sell: requested {requested}, held {held}")]
    InsufficientShares {
        symbol: String,
        requested: i64,
        held: i64,
    },

    #[error("holding of {symbol} would exceed the share limit: held {held}, adding {requested}")]
    HoldingLimit {
        symbol: String,
        held: i64,
        requested: i64,
    },

    #[error("persistence error for {path}: {reason}")]
    Persistence { path: String, reason: String },

    #[error("malformed portfolio record {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StocksimError {
    /// Bad type or range for a symbol, quantity, price, duration or model parameter.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StocksimError::InvalidSymbol { .. }
                | StocksimError::InvalidQuantity { .. }
                | StocksimError::InvalidPrice { .. }
                | StocksimError::InvalidDuration { .. }
                | StocksimError::InvalidParameter { .. }
        )
    }

    /// The durable record could not be read or written.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            StocksimError::Persistence { .. } | StocksimError::MalformedRecord { .. }
        )
    }
}

impl From<&StocksimError> for std::process::ExitCode {
    fn from(err: &StocksimError) -> Self {
        let code: u8 = match err {
            StocksimError::Io(_) => 1,
            StocksimError::ConfigParse { .. } | StocksimError::ConfigInvalid { .. } => 2,
            StocksimError::Persistence { .. } | StocksimError::MalformedRecord { .. } => 3,
            StocksimError::InvalidSymbol { .. }
            | StocksimError::InvalidQuantity { .. }
            | StocksimError::InvalidPrice { .. }
            | StocksimError::InvalidDuration { .. }
            | StocksimError::InvalidParameter { .. }
            | StocksimError::UnknownSymbol { .. }
            | StocksimError::DuplicateSymbol { .. } => 4,
            StocksimError::InsufficientCash { .. }
            | StocksimError::InsufficientShares { .. }
            | StocksimError::HoldingLimit { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Normalize a user-supplied symbol: trimmed, uppercase, non-empty, no inner whitespace.
pub fn normalize_symbol(symbol: &str) -> Result<String, StocksimError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(StocksimError::InvalidSymbol {
            symbol: symbol.to_string(),
            reason: "symbol is required".into(),
        });
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(StocksimError::InvalidSymbol {
            symbol: symbol.to_string(),
            reason: "symbol must not contain whitespace".into(),
        });
    }
    Ok(trimmed.to_uppercase())
}
