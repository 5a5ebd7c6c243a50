use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisassemblyError {
    #[error("bytecode of `{function}` is not loaded")]
    BytecodeUnavailable { function: String },
    #[error("unsupported opcode 0x{token:02X} at offset 0x{offset:08X}")]
    UnsupportedOpcode { token: u8, offset: u32 },
    #[error("malformed bytecode at offset 0x{offset:08X}: {reason}")]
    MalformedStream { offset: u32, reason: String },
}
