pub mod animation;
pub mod colors;
pub mod history;
pub mod layers;
