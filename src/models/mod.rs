pub mod asset;
pub mod user;
pub mod warehouse;

pub use asset::{Asset, NewAsset, STATUS_AVAILABLE, STATUS_IN_WAREHOUSE};
pub use user::{User, UserResponse};
pub use warehouse::{BinOccupancy, NewWarehouse, Warehouse};
