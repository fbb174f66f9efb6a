//! Parsers for Nintendo binary formats.
//!
//! All parsers follow the same conventions:
//!
//! * **Slice based** - `parse` takes the whole container as `&[u8]`.
//!   Offsets inside these formats jump around freely, so random access
//!   over an in-memory buffer ([`crate::cursor::ByteCursor`]) is simpler
//!   than a streaming reader.
//! * **Borrowing** - archive payloads ([`sarc::SarcFile::data`]) and the
//!   buffers behind a [`bfres::ResFile`] are borrowed, not copied.
//! * **Endian aware** - byte order is read from each container's BOM and
//!   applies to everything inside it. Embedded containers detect their own.
//! * **Compression is separate** - parsers receive already-decompressed
//!   bytes. Use [`crate::compression`] first when necessary.
//!
//! ## Format overview
//!
//! | Module    | Format | Description |
//! |-----------|--------|-------------|
//! | [`sarc`]  | SARC   | General-purpose asset archive; usually Yaz0-compressed (`.szs`) |
//! | [`byml`]  | BYML   | Typed tree of dictionaries, arrays and scalars |
//! | [`bfres`] | BFRES  | Models, materials, skeletons and embedded textures |
//! | [`bntx`]  | BNTX   | GPU texture container; one or more textures with mip chains |

pub mod bfres;
pub mod bntx;
pub mod byml;
pub mod sarc;
