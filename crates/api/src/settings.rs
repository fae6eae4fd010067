use std::time::Duration;

use crate::attendance::AttendancePolicy;

/// Runtime knobs shared by the HR services.
#[derive(Debug, Clone, Default)]
pub struct HrSettings {
    pub attendance: AttendancePolicy,
    /// Fixed pause before the assistant answers.
    pub chat_reply_delay: Duration,
}
