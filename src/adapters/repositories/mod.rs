mod pg_storage_handler;

pub use pg_storage_handler::PgStorageHandler;
