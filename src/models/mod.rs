pub mod biometric;
pub mod daily_metric;
pub mod plan;
pub mod task;
pub mod user;
pub mod weekly_review;
