pub mod dct;
pub mod erde;
pub mod lsbm;
pub mod pvd;
