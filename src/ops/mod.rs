pub mod fill;
pub mod filters;
pub mod selection;
pub mod shapes;
