//! ModelHub API Module
//!
//! The API module exposes the model service over two transports: a REST
//! API and a JSON-RPC 2.0 endpoint. Both call the same facade.

pub mod error;
pub mod handlers;
pub mod models;
pub mod rpc;
pub mod server;

pub use error::ApiError;
pub use handlers::ApiState;
pub use models::*;
pub use server::{create_rest_router, create_rpc_router, ApiServer};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.rest_port, 5000);
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.rest_addr(), "0.0.0.0:5000");
        assert_eq!(config.rpc_addr(), "0.0.0.0:50051");
    }
}
