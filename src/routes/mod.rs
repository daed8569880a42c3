/// Router Module Index
///
/// Splits the HTTP surface by how much identity a route needs. Access control is attached
/// per router (via Axum layers) in `create_router`, so a handler cannot end up public by
/// accident.

/// Routes open to anonymous callers. Some of them still read an optional token.
pub mod public;

/// Routes behind the mandatory-token layer. Staff checks happen in the handlers.
pub mod authenticated;

/// Routes nested under `/api/admin`, also behind the token layer; handlers require `admin`.
pub mod admin;
