use crate::{Entry, Reader, Writer};
use diag::{fail, rw, Result};

/// Forward entries from `reader` into `writer` one-for-one until `Ended`.
/// Before each forward the writer is asked whether it accepts the entry at
/// its current position; refusal is a pipe mismatch.
pub fn pipe_visit(reader: &mut dyn Reader, writer: &mut dyn Writer) -> Result<()> {
    loop {
        let entry = reader.peek()?;
        if entry == Entry::Ended {
            return Ok(());
        }
        if !writer.peek_write(entry)? {
            return fail!(rw::PIPE_READ_WRITE_MISMATCH, entry);
        }

        match entry {
            Entry::Nil => {
                reader.read_nil()?;
                writer.write_nil()?;
            }
            Entry::Bool => writer.write_bool(reader.read_bool()?)?,
            Entry::Name => writer.write_name(&reader.read_name()?)?,
            Entry::String => writer.write_string(&reader.read_string()?)?,
            Entry::Text => writer.write_text(&reader.read_text()?)?,
            Entry::Enum => writer.write_enum(&reader.read_enum()?)?,

            Entry::Int8 => writer.write_int8(reader.read_int8()?)?,
            Entry::Int16 => writer.write_int16(reader.read_int16()?)?,
            Entry::Int32 => writer.write_int32(reader.read_int32()?)?,
            Entry::Int64 => writer.write_int64(reader.read_int64()?)?,
            Entry::UInt8 => writer.write_uint8(reader.read_uint8()?)?,
            Entry::UInt16 => writer.write_uint16(reader.read_uint16()?)?,
            Entry::UInt32 => writer.write_uint32(reader.read_uint32()?)?,
            Entry::UInt64 => writer.write_uint64(reader.read_uint64()?)?,
            Entry::Float => writer.write_float(reader.read_float()?)?,
            Entry::Double => writer.write_double(reader.read_double()?)?,

            Entry::StructRoot => writer.write_struct_root(&reader.read_struct_root()?)?,
            Entry::StructEnd => writer.write_struct_end(&reader.read_struct_end()?)?,
            Entry::MapRoot => {
                reader.read_map_root()?;
                writer.write_map_root()?;
            }
            Entry::MapEnd => {
                reader.read_map_end()?;
                writer.write_map_end()?;
            }
            Entry::ArrayRoot => {
                reader.read_array_root()?;
                writer.write_array_root()?;
            }
            Entry::ArrayEnd => {
                reader.read_array_end()?;
                writer.write_array_end()?;
            }
            Entry::SetRoot => {
                reader.read_set_root()?;
                writer.write_set_root()?;
            }
            Entry::SetEnd => {
                reader.read_set_end()?;
                writer.write_set_end()?;
            }
            Entry::Blob => writer.write_blob(&reader.read_blob()?)?,

            // Host-specific kinds have no pipe surface in this core.
            _ => return fail!(rw::PIPE_READ_WRITE_MISMATCH, entry),
        }
    }
}

/// Consume exactly one balanced value from the reader, discarding it.
/// Skipping where no value remains is out of range.
pub fn skip_read(reader: &mut dyn Reader) -> Result<()> {
    let mut depth = 0usize;
    loop {
        let entry = reader.peek()?;
        match entry {
            Entry::Ended => return fail!(rw::SKIP_OUT_OF_RANGE),
            _ if entry.is_end() && depth == 0 => return fail!(rw::SKIP_OUT_OF_RANGE),

            Entry::Nil => reader.read_nil()?,
            Entry::Bool => {
                reader.read_bool()?;
            }
            Entry::Name => {
                reader.read_name()?;
            }
            Entry::String => {
                reader.read_string()?;
            }
            Entry::Text => {
                reader.read_text()?;
            }
            Entry::Enum => {
                reader.read_enum()?;
            }
            Entry::Int8 => {
                reader.read_int8()?;
            }
            Entry::Int16 => {
                reader.read_int16()?;
            }
            Entry::Int32 => {
                reader.read_int32()?;
            }
            Entry::Int64 => {
                reader.read_int64()?;
            }
            Entry::UInt8 => {
                reader.read_uint8()?;
            }
            Entry::UInt16 => {
                reader.read_uint16()?;
            }
            Entry::UInt32 => {
                reader.read_uint32()?;
            }
            Entry::UInt64 => {
                reader.read_uint64()?;
            }
            Entry::Float => {
                reader.read_float()?;
            }
            Entry::Double => {
                reader.read_double()?;
            }
            Entry::Blob => {
                reader.read_blob()?;
            }

            Entry::StructRoot => {
                reader.read_struct_root()?;
                depth += 1;
            }
            Entry::MapRoot => {
                reader.read_map_root()?;
                depth += 1;
            }
            Entry::ArrayRoot => {
                reader.read_array_root()?;
                depth += 1;
            }
            Entry::SetRoot => {
                reader.read_set_root()?;
                depth += 1;
            }
            Entry::StructEnd => {
                reader.read_struct_end()?;
                depth -= 1;
            }
            Entry::MapEnd => {
                reader.read_map_end()?;
                depth -= 1;
            }
            Entry::ArrayEnd => {
                reader.read_array_end()?;
                depth -= 1;
            }
            Entry::SetEnd => {
                reader.read_set_end()?;
                depth -= 1;
            }

            _ => return fail!(rw::PIPE_READ_WRITE_MISMATCH, entry),
        }

        if depth == 0 {
            return Ok(());
        }
    }
}
