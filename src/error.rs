use thiserror::Error;

/// Errors reported synchronously by grid operations and by
/// [SearchEngine::run](crate::SearchEngine::run). Every error leaves the grid
/// unchanged from before the failing call; cancellation and exhaustion are not
/// errors but [Outcome](crate::Outcome) values.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The requested grid or display region size is not usable.
    #[error("invalid dimensions: side length {side}, display region {region_px} px")]
    InvalidDimension { side: i32, region_px: i32 },
    /// A coordinate fell outside the grid.
    #[error("({row}, {col}) lies outside the {side}x{side} grid")]
    OutOfBounds { row: i32, col: i32, side: i32 },
    /// A search was started against a grid that does not satisfy the run
    /// preconditions, e.g. stale neighbour masks or unusable endpoints.
    #[error("search precondition violated: {0}")]
    PreconditionViolation(&'static str),
}
