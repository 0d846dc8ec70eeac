pub mod ask;
pub mod context;
pub mod doctor;
pub mod onboard;
pub mod serve;
