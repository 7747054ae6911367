//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! Routes:
//!
//! - `POST /api/orders` - create an order from a list of meal names
//! - `GET /api/orders/{id}` - read the meals of an order

pub mod handlers;
pub mod models;
