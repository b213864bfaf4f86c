use crate::types::{FrameId, Result, UmbraError};

use super::frame::Frame;
use super::list::FrameList;

/// Replacement strategy a pool runs with.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum ReplacementStrategy {
    /// Evict the longest-resident page; hits do not reorder frames.
    Fifo,
    /// Evict the least recently used page; hits refresh a frame's position.
    #[default]
    Lru,
}

impl ReplacementStrategy {
    /// Returns the string representation of the strategy.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplacementStrategy::Fifo => "fifo",
            ReplacementStrategy::Lru => "lru",
        }
    }

    /// Parses a strategy from a string (case-insensitive).
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "fifo" => Some(ReplacementStrategy::Fifo),
            "lru" => Some(ReplacementStrategy::Lru),
            _ => None,
        }
    }

    pub(crate) fn policy(self) -> Box<dyn ReplacementPolicy> {
        match self {
            ReplacementStrategy::Fifo => Box::new(Fifo),
            ReplacementStrategy::Lru => Box::new(Lru),
        }
    }
}

/// Behavior hooks that distinguish replacement policies.
///
/// Victim selection is shared by every policy: an unfilled pool hands out
/// never-used slots in creation order, a full pool scans the eviction order
/// from the rear for an unpinned frame. Policies differ only in how they
/// reposition frames on access, which is what makes the rear-most unpinned
/// frame the right victim for each of them.
pub(crate) trait ReplacementPolicy: Send + Sync {
    /// A pin found the page already resident in `idx`.
    fn on_hit(&self, order: &mut FrameList, frames: &mut [Frame], idx: FrameId);

    /// A page was just loaded into `idx`; the frame is currently unlinked.
    fn on_load(&self, order: &mut FrameList, frames: &mut [Frame], idx: FrameId) {
        order.push_front(frames, idx);
    }

    /// Picks the frame to receive a requested page.
    fn select_victim(
        &self,
        order: &FrameList,
        frames: &[Frame],
        occupied: usize,
    ) -> Result<FrameId> {
        if occupied < frames.len() {
            if let Some(idx) = frames.iter().position(|f| f.page.is_none()) {
                return Ok(idx);
            }
        }
        order
            .victim_from_rear(frames)
            .ok_or(UmbraError::NoEvictableFrame(frames.len()))
    }
}

/// First-in-first-out: a frame's position is fixed at load time.
pub(crate) struct Fifo;

impl ReplacementPolicy for Fifo {
    fn on_hit(&self, _order: &mut FrameList, _frames: &mut [Frame], _idx: FrameId) {}
}

/// Least-recently-used: every access refreshes a frame's position.
pub(crate) struct Lru;

impl ReplacementPolicy for Lru {
    fn on_hit(&self, order: &mut FrameList, frames: &mut [Frame], idx: FrameId) {
        order.move_to_front(frames, idx);
    }
}
