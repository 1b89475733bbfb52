// The typed token pipeline: the closed entry alphabet exchanged between
// every reader and writer, the reader/writer traits themselves, the putback
// adapter, and the generic visitors built on top of them.

mod entry;
mod name;
mod putback;
mod reader;
mod value;
mod visit;
mod writer;

#[cfg(test)]
mod tests;

pub use entry::Entry;
pub use name::Name;
pub use putback::PutbackReader;
pub use reader::Reader;
pub use value::{DataVariant, EnumValue, Value};
pub use visit::{pipe_visit, skip_read};
pub use writer::Writer;
