//! Gateway-side authentication: JWT issuance and verification.

pub mod jwt;

pub use jwt::{Claims, JwtAuth, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
