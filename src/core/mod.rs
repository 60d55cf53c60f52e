// Domain-layer modules and shared errors/models
pub mod pipeline {
    pub use crate::pipeline::*;
}

pub mod normalization {
    pub use crate::identity::*;
    pub use crate::phone::*;
    pub use crate::sanitize::*;
}

pub mod attribution {
    pub use crate::attribution::*;
    pub use crate::event_time::*;
}

pub mod errors {
    pub use crate::errors::*;
}
