//! External service integrations.

pub mod data_service {
    pub use crate::data_service::*;
}

pub mod advice_service {
    pub use crate::advice_service::*;
}
