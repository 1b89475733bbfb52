// Hand-written JSON codec over the entry alphabet: a scanning pull parser
// with putback, coercion and source-location diagnostics, and a structural
// emitter with cosmetic styles.

mod config;
mod reader;
mod token;
mod writer;

pub use config::{ReaderConfig, WriteConfig, WriteStyle, DEFAULT_MAX_KEY_LEN, MIN_MAX_KEY_LEN};
pub use reader::JsonReader;
pub use writer::JsonWriter;
