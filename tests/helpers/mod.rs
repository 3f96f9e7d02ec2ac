pub mod handlers;
pub mod scripted_bus;
