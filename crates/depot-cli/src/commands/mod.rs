pub mod common;
pub mod failed;
pub mod notify;
pub mod retry;
pub mod status;
pub mod sync;
pub mod tables;
