//! Input and output of hit batches: the streaming JSON array extractor, the tabular
//! (CSV) sink, and the debug PNG sink.
pub mod csv_writer;
pub mod png_sink;
pub mod stream_extractor;
