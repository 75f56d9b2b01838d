//! Envelope detection: the 8-byte magic prefix that marks a payload as a
//! structured meta document.

use serde::{Deserialize, Serialize};

/// Prefix of every meta document, big-endian bytes of [`KnownMagic::MetaDocumentV1`].
pub const META_DOCUMENT_MAGIC: [u8; 8] = [0xff, 0x0a, 0x89, 0xc6, 0x74, 0xee, 0x78, 0x74];

/// Strip the meta document prefix.
///
/// Returns the bytes after the prefix, or `None` if the payload is not a
/// meta document.
pub fn strip_envelope(raw: &[u8]) -> Option<&[u8]> {
    raw.strip_prefix(META_DOCUMENT_MAGIC.as_slice())
}

/// Check for the meta document prefix.
pub fn has_envelope(raw: &[u8]) -> bool {
    strip_envelope(raw).is_some()
}

/// Prepend the meta document prefix to `body`.
pub fn wrap_envelope(body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(META_DOCUMENT_MAGIC.len() + body.len());
    buf.extend_from_slice(&META_DOCUMENT_MAGIC);
    buf.extend_from_slice(body);
    buf
}

/// Well-known magic numbers.
///
/// The document prefix is one of them; the rest name the content carried in
/// a document's magic number field. Unknown values are not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u64)]
pub enum KnownMagic {
    /// Prefixes every meta document.
    MetaDocumentV1 = 0xff0a89c674ee7874,
    OpMetaV1 = 0xffe5282f43e495b4,
    DotrainV1 = 0xffdac2f2f37be894,
    RainlangV1 = 0xff1c198cec3b48a7,
    SolidityAbiV2 = 0xffe5ffb4a3ff2cde,
    AuthoringMetaV1 = 0xffe9e3a02ca8e235,
    InterpreterCallerMetaV1 = 0xffc21bbf86cc199b,
    ExpressionDeployerV2BytecodeV1 = 0xffdb988a8cd04d32,
}

impl KnownMagic {
    /// All known magic numbers.
    pub const ALL: [KnownMagic; 8] = [
        Self::MetaDocumentV1,
        Self::OpMetaV1,
        Self::DotrainV1,
        Self::RainlangV1,
        Self::SolidityAbiV2,
        Self::AuthoringMetaV1,
        Self::InterpreterCallerMetaV1,
        Self::ExpressionDeployerV2BytecodeV1,
    ];

    pub fn to_u64(self) -> u64 {
        self as u64
    }

    /// Big-endian bytes, as used for binary prefixes.
    pub fn to_prefix_bytes(self) -> [u8; 8] {
        self.to_u64().to_be_bytes()
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.to_u64() == value)
    }

    /// Kebab-case name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::MetaDocumentV1 => "meta-document-v1",
            Self::OpMetaV1 => "op-meta-v1",
            Self::DotrainV1 => "dotrain-v1",
            Self::RainlangV1 => "rainlang-v1",
            Self::SolidityAbiV2 => "solidity-abi-v2",
            Self::AuthoringMetaV1 => "authoring-meta-v1",
            Self::InterpreterCallerMetaV1 => "interpreter-caller-meta-v1",
            Self::ExpressionDeployerV2BytecodeV1 => "expression-deployer-v2-bytecode-v1",
        }
    }
}
