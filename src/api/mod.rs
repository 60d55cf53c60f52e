// Thin namespace wrapper for API-layer components
pub mod handlers {
    pub use crate::handlers::*;
}

pub mod redirect_handler {
    pub use crate::redirect_handler::*;
}
