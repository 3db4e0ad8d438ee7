use crate::frame::CallFrame;

/// LIFO of open frames.
///
/// `occupancy` counts logically pushed frames and is what "is the stack empty"
/// decisions look at; the host-reported `depth` of each frame is only used to
/// detect and repair inconsistent exits.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: Vec<CallFrame>,
    occupancy: usize,
    orphaned: u64,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
        self.occupancy += 1;
    }

    pub fn pop(&mut self) -> Option<CallFrame> {
        if self.occupancy == 0 {
            return None;
        }
        let frame = self.frames.pop()?;
        self.occupancy -= 1;
        Some(frame)
    }

    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut CallFrame> {
        self.frames.last_mut()
    }

    /// Pops every frame deeper than `target_depth` and hands it to
    /// `on_orphan`. These are frames the host never reported an exit for.
    /// Returns the number of frames discarded.
    pub fn repair_to<F>(&mut self, target_depth: i32, mut on_orphan: F) -> usize
    where
        F: FnMut(CallFrame),
    {
        let mut discarded = 0;
        while self.top().map_or(false, |top| top.depth > target_depth) {
            match self.pop() {
                Some(frame) => {
                    on_orphan(frame);
                    discarded += 1;
                }
                None => break,
            }
        }
        self.orphaned += discarded as u64;
        discarded
    }

    /// Pops all remaining frames as orphans, deepest first.
    pub fn drain<F>(&mut self, on_orphan: F) -> usize
    where
        F: FnMut(CallFrame),
    {
        self.repair_to(i32::MIN, on_orphan)
    }

    pub fn occupancy(&self) -> usize {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    /// Frames closed by `repair_to` or `drain` over the stack's lifetime.
    pub fn orphaned_frames(&self) -> u64 {
        self.orphaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CallEvent;
    use std::time::Duration;

    fn frame(name: &str, depth: i32) -> CallFrame {
        CallFrame::open(&CallEvent::new(name, depth), Duration::ZERO).unwrap()
    }

    #[test]
    fn test_push_pop() {
        let mut stack = CallStack::new();
        assert!(stack.pop().is_none());
        assert!(stack.top().is_none());

        stack.push(frame("a", 1));
        stack.push(frame("b", 2));
        assert_eq!(stack.occupancy(), 2);
        assert_eq!(stack.top().unwrap().name, "b");

        assert_eq!(stack.pop().unwrap().name, "b");
        assert_eq!(stack.pop().unwrap().name, "a");
        assert!(stack.pop().is_none());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_repair_to_discards_deeper_frames() {
        let mut stack = CallStack::new();
        stack.push(frame("a", 1));
        stack.push(frame("b", 2));
        stack.push(frame("c", 3));

        let mut orphans = vec![];
        let discarded = stack.repair_to(1, |f| orphans.push(f.name));

        assert_eq!(discarded, 2);
        assert_eq!(orphans, vec!["c", "b"]);
        assert_eq!(stack.top().unwrap().name, "a");
        assert_eq!(stack.occupancy(), 1);
        assert_eq!(stack.orphaned_frames(), 2);
    }

    #[test]
    fn test_repair_to_consistent_depth_is_noop() {
        let mut stack = CallStack::new();
        stack.push(frame("a", 1));
        stack.push(frame("b", 2));

        assert_eq!(stack.repair_to(2, |_| panic!("nothing is orphaned")), 0);
        assert_eq!(stack.repair_to(5, |_| panic!("nothing is orphaned")), 0);
        assert_eq!(stack.occupancy(), 2);
    }

    #[test]
    fn test_repair_to_can_empty_the_stack() {
        let mut stack = CallStack::new();
        stack.push(frame("a", 3));
        stack.push(frame("b", 4));

        assert_eq!(stack.repair_to(1, |_| {}), 2);
        assert!(stack.is_empty());
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_drain() {
        let mut stack = CallStack::new();
        stack.push(frame("a", 0));
        stack.push(frame("b", 1));

        let mut orphans = vec![];
        assert_eq!(stack.drain(|f| orphans.push(f.name)), 2);
        assert_eq!(orphans, vec!["b", "a"]);
        assert!(stack.is_empty());
    }
}
