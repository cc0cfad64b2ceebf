use std::fmt;

use serde::{Deserialize, Serialize};

/// What happens to running frame loops when a new one is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPolicy {
    /// Cancel every live loop before starting the new one. At most one loop
    /// is ever live.
    #[default]
    Restart,
    /// Leave earlier loops running. Each live loop advances the rotation once
    /// per frame, so the object spins faster with every load.
    Stack,
}

impl std::str::FromStr for AnimationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "restart" => Ok(Self::Restart),
            "stack" => Ok(Self::Stack),
            other => Err(format!(
                "unknown animation policy `{other}` (expected restart or stack)"
            )),
        }
    }
}

/// Handle of one self-rescheduling frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoopToken(u64);

impl fmt::Display for LoopToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loop#{}", self.0)
    }
}

/// Whether a frame callback should schedule itself again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Stopped,
}

/// Result of starting a loop: the new token and the loops it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStart {
    pub token: LoopToken,
    pub cancelled: Vec<LoopToken>,
}

/// Bookkeeping for the frame loops started by the viewer.
///
/// The supervisor does not schedule anything itself; hosts ask it whether a
/// loop is still live before doing a frame's work.
#[derive(Debug, Default)]
pub struct FrameLoops {
    policy: AnimationPolicy,
    next_id: u64,
    live: Vec<LoopToken>,
}

impl FrameLoops {
    pub fn new(policy: AnimationPolicy) -> Self {
        Self {
            policy,
            next_id: 0,
            live: Vec::new(),
        }
    }

    pub fn start(&mut self) -> LoopStart {
        let cancelled = match self.policy {
            AnimationPolicy::Restart => self.cancel_all(),
            AnimationPolicy::Stack => Vec::new(),
        };
        self.next_id += 1;
        let token = LoopToken(self.next_id);
        self.live.push(token);
        LoopStart { token, cancelled }
    }

    pub fn cancel_all(&mut self) -> Vec<LoopToken> {
        std::mem::take(&mut self.live)
    }

    pub fn is_live(&self, token: LoopToken) -> bool {
        self.live.contains(&token)
    }

    /// Live loops in the order they were started.
    pub fn live(&self) -> &[LoopToken] {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_keeps_a_single_loop() {
        let mut loops = FrameLoops::new(AnimationPolicy::Restart);
        let first = loops.start();
        assert!(first.cancelled.is_empty());
        let second = loops.start();
        assert_eq!(second.cancelled, vec![first.token]);
        assert!(!loops.is_live(first.token));
        assert!(loops.is_live(second.token));
        assert_eq!(loops.live_count(), 1);
    }

    #[test]
    fn stack_accumulates_loops_in_start_order() {
        let mut loops = FrameLoops::new(AnimationPolicy::Stack);
        let a = loops.start().token;
        let b = loops.start().token;
        let c = loops.start().token;
        assert_eq!(loops.live(), &[a, b, c]);
        assert_eq!(loops.cancel_all(), vec![a, b, c]);
        assert!(!loops.is_live(b));
    }

    #[test]
    fn tokens_are_never_reused() {
        let mut loops = FrameLoops::new(AnimationPolicy::Restart);
        let a = loops.start().token;
        loops.cancel_all();
        let b = loops.start().token;
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn policy_parses_from_cli_values() {
        assert_eq!("restart".parse::<AnimationPolicy>(), Ok(AnimationPolicy::Restart));
        assert_eq!("stack".parse::<AnimationPolicy>(), Ok(AnimationPolicy::Stack));
        assert!("both".parse::<AnimationPolicy>().is_err());
    }
}
