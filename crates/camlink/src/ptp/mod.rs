//! PTP and PTP/IP binary codec.
//!
//! Pure functions over byte buffers: packet framing, the PTP string and array
//! encodings, and the DeviceInfo / StorageInfo / ObjectInfo datasets. No I/O
//! beyond `std::io::Read` adapters, no state.
//!
//! # Architecture
//!
//! - `codes`: packet types, operation and response codes, format names
//! - `reader` / `writer`: little-endian field access with bounds checks
//! - `packet`: header handling and the init / operation packets
//! - `datasets`: the three PTP datasets this crate decodes

pub mod codes;
pub mod datasets;
pub mod errors;
pub mod packet;
pub mod reader;
pub mod writer;

pub use codes::{OperationCode, PacketType, ResponseCode, format_name};
pub use datasets::{DeviceInfo, ObjectInfo, StorageInfo, parse_ptp_datetime};
pub use errors::DecodeError;
pub use reader::PayloadReader;
pub use writer::PayloadWriter;
