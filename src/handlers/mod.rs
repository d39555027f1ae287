pub mod capture;
pub mod logs;
pub mod rewards;
pub mod users;
