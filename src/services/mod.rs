pub mod booking;
pub mod notify;
pub mod payment;
pub mod ticket;
