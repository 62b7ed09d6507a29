//! Seek-back policy

mod policy;

pub use policy::{
    coalesce, decide, CoalescingWindow, IdempotenceKey, SeekBackConfig, SeekBackRequest,
    SeekTrigger, TriggerSetting,
};
