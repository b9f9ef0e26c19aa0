// ── Input pipeline ──
//
// Device node → fixed-size records → RawEvent → ClassifiedEvent.

pub mod autodetect;
pub mod classify;
pub mod decoder;
pub mod device;
