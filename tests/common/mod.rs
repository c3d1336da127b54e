pub mod fakes;
pub mod images;
