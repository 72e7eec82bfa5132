pub mod error;
pub mod response;
pub mod storage;
pub mod token;
