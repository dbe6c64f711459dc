pub mod container;
pub mod dct;
pub mod edges;
pub mod luma;
