pub mod jobs;
pub mod resets;
pub mod users;
