//! PTP/IP packet types, PTP operation and response codes, and object format names.

/// PTP/IP packet type, the second u32 of every packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PacketType {
    InitCommandRequest = 0x0001,
    InitCommandAck = 0x0002,
    InitEventRequest = 0x0003,
    InitEventAck = 0x0004,
    InitFail = 0x0005,
    OperationRequest = 0x0006,
    OperationResponse = 0x0007,
    Event = 0x0008,
    StartData = 0x0009,
    Data = 0x000A,
    Cancel = 0x000B,
    EndData = 0x000C,
    ProbeRequest = 0x000D,
    ProbeResponse = 0x000E,
}

impl PacketType {
    /// Maps a raw header value to a known packet type.
    pub fn from_u32(value: u32) -> Option<Self> {
        let packet_type = match value {
            0x0001 => Self::InitCommandRequest,
            0x0002 => Self::InitCommandAck,
            0x0003 => Self::InitEventRequest,
            0x0004 => Self::InitEventAck,
            0x0005 => Self::InitFail,
            0x0006 => Self::OperationRequest,
            0x0007 => Self::OperationResponse,
            0x0008 => Self::Event,
            0x0009 => Self::StartData,
            0x000A => Self::Data,
            0x000B => Self::Cancel,
            0x000C => Self::EndData,
            0x000D => Self::ProbeRequest,
            0x000E => Self::ProbeResponse,
            _ => return None,
        };
        Some(packet_type)
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// PTP operation codes this crate issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OperationCode {
    GetDeviceInfo = 0x1001,
    OpenSession = 0x1002,
    CloseSession = 0x1003,
    GetStorageIds = 0x1004,
    GetStorageInfo = 0x1005,
    GetNumObjects = 0x1006,
    GetObjectHandles = 0x1007,
    GetObjectInfo = 0x1008,
    GetObject = 0x1009,
    GetThumb = 0x100A,
}

impl OperationCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Maps a raw operation code back to a known operation.
    pub fn from_u16(value: u16) -> Option<Self> {
        let op = match value {
            0x1001 => Self::GetDeviceInfo,
            0x1002 => Self::OpenSession,
            0x1003 => Self::CloseSession,
            0x1004 => Self::GetStorageIds,
            0x1005 => Self::GetStorageInfo,
            0x1006 => Self::GetNumObjects,
            0x1007 => Self::GetObjectHandles,
            0x1008 => Self::GetObjectInfo,
            0x1009 => Self::GetObject,
            0x100A => Self::GetThumb,
            _ => return None,
        };
        Some(op)
    }
}

/// A PTP response code.
///
/// Kept as a newtype rather than an enum because devices routinely answer with
/// vendor-specific codes that still need to travel through the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct ResponseCode(pub u16);

impl ResponseCode {
    pub const UNDEFINED: Self = Self(0x2000);
    pub const OK: Self = Self(0x2001);
    pub const GENERAL_ERROR: Self = Self(0x2002);
    pub const SESSION_NOT_OPEN: Self = Self(0x2003);
    pub const INVALID_TRANSACTION_ID: Self = Self(0x2004);
    pub const OPERATION_NOT_SUPPORTED: Self = Self(0x2005);
    pub const PARAMETER_NOT_SUPPORTED: Self = Self(0x2006);
    pub const INCOMPLETE_TRANSFER: Self = Self(0x2007);
    pub const INVALID_STORAGE_ID: Self = Self(0x2008);
    pub const INVALID_OBJECT_HANDLE: Self = Self(0x2009);
    pub const ACCESS_DENIED: Self = Self(0x200F);
    pub const NO_THUMBNAIL_PRESENT: Self = Self(0x2010);
    pub const STORE_NOT_AVAILABLE: Self = Self(0x2013);
    pub const DEVICE_BUSY: Self = Self(0x2019);
    pub const SESSION_ALREADY_OPEN: Self = Self(0x201E);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// Standard name of the code, if it's one we know.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::UNDEFINED => "Undefined",
            Self::OK => "OK",
            Self::GENERAL_ERROR => "GeneralError",
            Self::SESSION_NOT_OPEN => "SessionNotOpen",
            Self::INVALID_TRANSACTION_ID => "InvalidTransactionID",
            Self::OPERATION_NOT_SUPPORTED => "OperationNotSupported",
            Self::PARAMETER_NOT_SUPPORTED => "ParameterNotSupported",
            Self::INCOMPLETE_TRANSFER => "IncompleteTransfer",
            Self::INVALID_STORAGE_ID => "InvalidStorageID",
            Self::INVALID_OBJECT_HANDLE => "InvalidObjectHandle",
            Self::ACCESS_DENIED => "AccessDenied",
            Self::NO_THUMBNAIL_PRESENT => "NoThumbnailPresent",
            Self::STORE_NOT_AVAILABLE => "StoreNotAvailable",
            Self::DEVICE_BUSY => "DeviceBusy",
            Self::SESSION_ALREADY_OPEN => "SessionAlreadyOpen",
            _ => return None,
        };
        Some(name)
    }
}

impl std::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:04X})", self.0),
            None => write!(f, "0x{:04X}", self.0),
        }
    }
}

/// Object format code for associations (folders).
pub const FORMAT_ASSOCIATION: u16 = 0x3001;

/// Returns a human-readable name for an object format code.
///
/// Unknown codes map to `Format_XXXX` with the code in uppercase hex.
pub fn format_name(code: u16) -> String {
    let name = match code {
        0x3000 => "Undefined",
        0x3001 => "Association",
        0x3002 => "Script",
        0x3006 => "DPOF",
        0x3800 => "JPEG",
        0x3801 => "TIFF-EP",
        0x3802 => "FlashPix",
        0x3803 => "BMP",
        0x3804 => "CIFF",
        0x3807 => "GIF",
        0x3808 => "JFIF",
        0x380B => "PNG",
        0x380D => "TIFF",
        0x3811 => "JP2",
        0x3812 => "JPX",
        0xB101 => "RAW",
        0xB103 => "CR2",
        0xB104 => "CR3",
        0xB108 => "NEF",
        _ => return format!("Format_{code:04X}"),
    };
    name.to_string()
}
