/// Encoding of the empty string, and therefore of integer zero.
pub const RLP_NULL: u8 = 0x80;
/// Encoding of the empty list.
pub const RLP_EMPTY_LIST: u8 = 0xc0;
