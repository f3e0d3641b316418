pub mod refresh;
pub mod render;
pub mod serve;
pub mod status;
