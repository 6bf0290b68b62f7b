pub mod controller;
pub mod crud;
pub mod model;
pub mod routes;
pub mod schema;
pub mod store;

pub use crud::MonitorCrud;
pub use routes::status_routes;
pub use store::{MonitorStore, StoreError};
