pub mod chat;
pub mod ports;
pub mod session_loop;
