/// Status codes returned by the native runtime.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeStatus {
    Ok = 0,
    InvalidHandle = 1,
    UnknownType = 2,
    UnknownSignal = 3,
    InvalidSlot = 4,
    NotConnected = 5,
    InvalidArgument = 6,
    BufferTooSmall = 7,
    InternalError = 8,
}
