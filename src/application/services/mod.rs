mod auth_validator;
mod storage_handler;

pub use auth_validator::AuthValidator;
pub use storage_handler::StorageHandler;
