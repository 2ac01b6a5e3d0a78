use crate::layout_hierarchical::{Positions, compute_positions};
use crate::store::Store;
use crate::versioned::Memoized;

pub struct Cache {
    /// Laid out once per document and spacing; drags edit it in place.
    pub positions: Memoized<Store, (u64, u64), Positions>,
}

impl Cache {
    pub fn new() -> Self {
        let positions = Memoized::new(
            |s: &Store| (s.document.version(), s.layout.version()),
            |s: &Store| {
                compute_positions(
                    s.document.get(),
                    s.interaction.canvas_center(),
                    s.layout.get(),
                )
            },
        );
        Self { positions }
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
