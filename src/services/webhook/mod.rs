pub mod types;
pub mod providers;
pub mod retry;
pub mod dispatcher;
pub mod delivery;

pub use types::*;
pub use providers::*;
pub use retry::*;
pub use dispatcher::*;
pub use delivery::*;
