pub mod batch;
pub mod figures;
