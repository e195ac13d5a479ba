/// Caps for the pre-flight message throttle. Both windows slide over the
/// same trailing interval; the global cap is checked before the
/// per-conversation cap.
#[derive(Debug, Clone, Copy)]
pub struct MessageLimits {
    pub window_seconds: u64,
    pub global_per_window: i64,
    pub per_conversation_per_window: i64,
}

impl MessageLimits {
    pub fn standard() -> Self {
        MessageLimits {
            window_seconds: 60,
            global_per_window: 10,
            per_conversation_per_window: 20,
        }
    }
}

impl Default for MessageLimits {
    fn default() -> Self {
        Self::standard()
    }
}
