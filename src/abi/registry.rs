//! Interface fragments for the content registry contract

use super::codec::ParamType;
use super::fragment::{Event, EventParam, Function};

const UINT8: ParamType = ParamType::Uint(8);
const UINT256: ParamType = ParamType::Uint(256);
const UINT256_ARRAY: ParamType = ParamType::Array(&UINT256);
const UINT8_ARRAY: ParamType = ParamType::Array(&UINT8);
const STRING_ARRAY: ParamType = ParamType::Array(&ParamType::String);
const ADDRESS_ARRAY: ParamType = ParamType::Array(&ParamType::Address);
const BOOL_ARRAY: ParamType = ParamType::Array(&ParamType::Bool);

/// topic0 of the registry's `ContentUploaded` event on the reference deployment
///
/// Kept as a configured value rather than derived: the deployed contract's
/// signature hash does not match the signature its ABI advertises.
pub const CONTENT_UPLOADED_TOPIC: &str =
    "0xaf9112b14cab444584e1c1760596128c324b98422facac9ee00a830d560bf775";

/// `getLatestContent(uint256 count) returns (uint256[])`, most recent first
pub const GET_LATEST_CONTENT: Function = Function {
    name: "getLatestContent",
    inputs: &[UINT256],
    outputs: &[UINT256_ARRAY],
};

/// `getContent(uint256)` returns uploader, contentType, ipfsHash, title,
/// qualityTier, downloadCount, totalPointsEarned, uploadTimestamp, isActive
pub const GET_CONTENT: Function = Function {
    name: "getContent",
    inputs: &[UINT256],
    outputs: &[
        ParamType::Address,
        UINT8,
        ParamType::String,
        ParamType::String,
        UINT8,
        UINT256,
        UINT256,
        UINT256,
        ParamType::Bool,
    ],
};

/// Bulk variant of `getContent` returning parallel arrays
pub const GET_CONTENT_BATCH: Function = Function {
    name: "getContentBatch",
    inputs: &[UINT256_ARRAY],
    outputs: &[
        ADDRESS_ARRAY,
        UINT8_ARRAY,
        STRING_ARRAY,
        STRING_ARRAY,
        UINT8_ARRAY,
        UINT256_ARRAY,
        BOOL_ARRAY,
    ],
};

/// Metadata pointer for a record
pub const URI: Function = Function {
    name: "uri",
    inputs: &[UINT256],
    outputs: &[ParamType::String],
};

pub const GET_LATEST_TOKEN_ID: Function = Function {
    name: "getLatestTokenId",
    inputs: &[],
    outputs: &[UINT256],
};

pub const TOTAL_SUPPLY: Function = Function {
    name: "totalSupply",
    inputs: &[],
    outputs: &[UINT256],
};

/// `uploadContent(uint8, string, string, string, string, string[]) returns (uint256)`
pub const UPLOAD_CONTENT: Function = Function {
    name: "uploadContent",
    inputs: &[
        UINT8,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        ParamType::String,
        STRING_ARRAY,
    ],
    outputs: &[UINT256],
};

pub const UPDATE_DOWNLOAD_COUNT: Function = Function {
    name: "updateDownloadCount",
    inputs: &[UINT256, UINT256],
    outputs: &[],
};

/// `ContentUploaded(uint256 indexed tokenId, address indexed uploader, uint8, string, string)`
pub const CONTENT_UPLOADED: Event = Event {
    name: "ContentUploaded",
    inputs: &[
        EventParam { kind: UINT256, indexed: true },
        EventParam { kind: ParamType::Address, indexed: true },
        EventParam { kind: UINT8, indexed: false },
        EventParam { kind: ParamType::String, indexed: false },
        EventParam { kind: ParamType::String, indexed: false },
    ],
};

/// ERC-1155 `TransferSingle(operator, from, to, id, value)`
pub const TRANSFER_SINGLE: Event = Event {
    name: "TransferSingle",
    inputs: &[
        EventParam { kind: ParamType::Address, indexed: true },
        EventParam { kind: ParamType::Address, indexed: true },
        EventParam { kind: ParamType::Address, indexed: true },
        EventParam { kind: UINT256, indexed: false },
        EventParam { kind: UINT256, indexed: false },
    ],
};
