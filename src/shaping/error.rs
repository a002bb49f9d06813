use thiserror::Error;

/// Errors raised when the simulation's data contract is violated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapingError {
    #[error("Postprocessor used before reset")]
    NotReset,

    #[error("Unknown terrain code: {0}")]
    UnknownTerrain(i16),

    #[error("Unknown event code: {0}")]
    UnknownEvent(i16),

    #[error("Cell ({row}, {col}) lies outside a {map_size}x{map_size} map")]
    OutOfMap { row: i16, col: i16, map_size: usize },

    #[error("Missing action target mask: {action}/{argument}")]
    MissingActionTarget { action: String, argument: String },

    #[error("Action vector has {len} components, expected at least {expected}")]
    ActionTooShort { len: usize, expected: usize },

    #[error("Sell price {0} is outside the price mask")]
    PriceOutOfRange(i32),

    #[error("Combat attributes have length {got}, expected {expected}")]
    CombatAttrLength { got: usize, expected: usize },

    #[error("{name} has {got} columns, expected at least {expected}")]
    TooFewColumns {
        name: &'static str,
        got: usize,
        expected: usize,
    },
}
