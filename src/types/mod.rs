pub mod analysis;
pub mod documentation;
pub mod paper;
pub mod quality;
