pub mod assets;
pub mod auth;
pub mod billing;
pub mod buildings;
pub mod flags;
pub mod meters;
pub mod notifications;
pub mod reports;
pub mod security;
pub mod tenants;

pub use assets::*;
pub use auth::*;
pub use billing::*;
pub use buildings::*;
pub use flags::*;
pub use meters::*;
pub use notifications::*;
pub use reports::*;
pub use security::*;
pub use tenants::*;
