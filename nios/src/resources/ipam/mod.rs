//! IP address management: host records and their address associations

pub mod allocation;
pub mod association;
