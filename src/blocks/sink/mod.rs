mod vector_sink;

pub use vector_sink::*;
