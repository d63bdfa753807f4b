pub mod chat;
pub mod init;
pub mod levels;
pub mod memory;
pub mod status;
pub mod stores;
