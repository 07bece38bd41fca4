//! DST transition policies for wall-clock booking times.

use serde::{Deserialize, Serialize};

/// Policy for booking times that fall in a spring-forward gap.
///
/// Fall-back ambiguity is always resolved to the earlier instant; only the
/// non-existent case needs a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Refuse to produce an instant (e.g., 2:30 AM during spring forward)
    Skip,
    /// Keep the pre-transition offset, so 02:30 becomes 03:30 in the new offset
    #[default]
    ShiftForward,
}
