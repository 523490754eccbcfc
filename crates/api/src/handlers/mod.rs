pub mod csv;
pub mod jobs;
