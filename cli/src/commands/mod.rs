pub mod configure;
pub mod debug;
pub mod pipe;
