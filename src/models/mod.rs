pub mod appointment;
pub mod connection;
pub mod enums;
pub mod report;
pub mod responses;
pub mod user;

pub use appointment::*;
pub use connection::*;
pub use enums::*;
pub use report::*;
pub use responses::*;
pub use user::*;
