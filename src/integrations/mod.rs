//! External service integrations.

pub mod capi_client {
    pub use crate::capi_client::*;
}

pub mod capi_models {
    pub use crate::capi_models::*;
}

pub mod lead_models {
    pub use crate::lead_models::*;
}
