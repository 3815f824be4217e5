pub mod chunk_buffer;
pub mod git_blob;
