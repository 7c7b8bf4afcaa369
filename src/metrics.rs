use crate::types::Pt;

#[derive(Debug, Clone, PartialEq)]
pub struct PageMetrics {
    pub page_number: usize,
    // Distance the cursor travelled below the top margin on this page.
    pub used_height: Pt,
    pub command_count: usize,
    pub block_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetrics {
    pub pages: Vec<PageMetrics>,
    // Sum of every advance the cursor made.
    pub total_placed_height: Pt,
    pub degraded_blocks: usize,
    pub render_ms: f64,
}

impl DocumentMetrics {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn last_page_used_height(&self) -> Pt {
        self.pages
            .last()
            .map(|page| page.used_height)
            .unwrap_or(Pt::ZERO)
    }
}
