pub mod chroma;
pub mod decode;
pub mod source;
