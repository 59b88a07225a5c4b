// Domain-layer modules and shared errors/models
pub mod models {
    pub use crate::models::*;
}

pub mod formatting {
    pub use crate::formatting::*;
}

pub mod prompt {
    pub use crate::prompt::*;
}

pub mod errors {
    pub use crate::errors::*;
}
