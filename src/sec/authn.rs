pub mod initiator;
pub mod password;
pub mod otep;
pub mod twofactor;
