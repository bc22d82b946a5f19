/// Correlation ids for outgoing requests.
///
/// Starts at 0 and hands out 1, 2, ... wrapping from `u32::MAX` back to 1.
/// Zero means "uncorrelated" on the wire and is never returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdSequence {
    current: u32,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence whose next id follows `current`.
    pub fn starting_after(current: u32) -> Self {
        Self { current }
    }

    /// Last id handed out, 0 before the first call to `next`.
    pub fn current(&self) -> u32 {
        self.current
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> u32 {
        self.current = match self.current.checked_add(1) {
            Some(id) => id,
            None => 1,
        };
        self.current
    }
}
