//! Per-type sequence counters used to give nodes unique names.

use super::NodeKind;

/// Naming state for one graph.
///
/// Each node type has its own counter; names take the form `ABBREV_N`.
/// [`NamingContext::reset`] restarts every counter at 1 so that a rename pass
/// over an unchanged tree reproduces the same names.
#[derive(Clone, Debug)]
pub struct NamingContext {
    counts: [u32; NodeKind::COUNT],
}

impl NamingContext {
    pub fn new() -> Self {
        Self { counts: [1; NodeKind::COUNT] }
    }

    pub fn reset(&mut self) {
        self.counts = [1; NodeKind::COUNT];
    }

    /// Produce the next name for `kind` and advance its counter.
    pub fn next_name(&mut self, kind: NodeKind) -> String {
        let slot = &mut self.counts[kind.index()];
        let seq = *slot;
        *slot += 1;
        format!("{}_{}", kind.abbrev(), seq)
    }
}

impl Default for NamingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_per_kind() {
        let mut ctx = NamingContext::new();
        assert_eq!(ctx.next_name(NodeKind::Coords), "COORD_1");
        assert_eq!(ctx.next_name(NodeKind::Coords), "COORD_2");
        assert_eq!(ctx.next_name(NodeKind::Shape), "SHAPE_1");
        ctx.reset();
        assert_eq!(ctx.next_name(NodeKind::Coords), "COORD_1");
    }
}
