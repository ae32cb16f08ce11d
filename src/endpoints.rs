//! The API endpoints URIs.

/// The root route, which greets the client.
pub const ROOT: &str = "/";
/// The route for checking that the database is reachable.
pub const DB_CHECK: &str = "/db-check";
/// The route to record and list purchases.
pub const PURCHASES: &str = "/purchases";
/// The route for the most purchased products.
pub const TOP_PRODUCTS: &str = "/purchases/top";
