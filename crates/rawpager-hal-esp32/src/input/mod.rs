pub mod cyd;
pub mod xpt2046;
