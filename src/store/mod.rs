pub mod kv;
pub mod practice;
pub mod schema;
pub mod selection;
