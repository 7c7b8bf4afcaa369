use crate::canvas::Canvas;
use crate::error::RenderError;
use crate::metrics::PageMetrics;
use crate::types::{PageGeometry, Pt};

/// Vertical write position on the current page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutState {
    pub page_index: usize,
    pub cursor_y: Pt,
    pub geometry: PageGeometry,
}

/// The single owner of vertical layout state for one render.
///
/// Placement is two-step: [`PageCursor::ensure_space`] before drawing an atomic
/// unit (breaking the page first when the unit would cross the bottom margin),
/// then [`PageCursor::advance`] by the height that was drawn. Keeping the two
/// apart lets callers measure variable-height content once and place it without
/// booking the space twice.
pub struct PageCursor {
    state: LayoutState,
    placed_height: Pt,
    page_blocks: usize,
    pages: Vec<PageMetrics>,
}

impl PageCursor {
    pub fn new(geometry: PageGeometry) -> Result<Self, RenderError> {
        geometry.validate()?;
        Ok(Self {
            state: LayoutState {
                page_index: 0,
                cursor_y: geometry.margins.top,
                geometry,
            },
            placed_height: Pt::ZERO,
            page_blocks: 0,
            pages: Vec::new(),
        })
    }

    pub fn state(&self) -> LayoutState {
        self.state
    }

    pub fn page_index(&self) -> usize {
        self.state.page_index
    }

    pub fn y(&self) -> Pt {
        self.state.cursor_y
    }

    pub fn left(&self) -> Pt {
        self.state.geometry.margins.left
    }

    pub fn content_width(&self) -> Pt {
        self.state.geometry.content_width()
    }

    pub fn usable_height(&self) -> Pt {
        self.state.geometry.usable_height()
    }

    fn top(&self) -> Pt {
        self.state.geometry.margins.top
    }

    fn bottom_limit(&self) -> Pt {
        self.state.geometry.size.height - self.state.geometry.margins.bottom
    }

    pub fn remaining(&self) -> Pt {
        (self.bottom_limit() - self.state.cursor_y).max(Pt::ZERO)
    }

    pub fn is_page_empty(&self) -> bool {
        self.state.cursor_y <= self.top()
    }

    pub fn fits(&self, height: Pt) -> bool {
        self.state.cursor_y + height <= self.bottom_limit()
    }

    /// Breaks the page when `height` would overflow it. Returns whether a break
    /// happened.
    ///
    /// A unit taller than a whole page is left on a page that is still empty;
    /// breaking again would only emit blank pages.
    pub fn ensure_space(&mut self, height: Pt, canvas: &mut Canvas) -> bool {
        if self.fits(height) || self.is_page_empty() {
            return false;
        }
        self.break_page(canvas);
        true
    }

    /// Moves the cursor down without any overflow check.
    pub fn advance(&mut self, height: Pt) {
        self.state.cursor_y += height;
        self.placed_height += height;
    }

    /// Moves the cursor down, stopping at the bottom margin.
    pub fn advance_saturating(&mut self, height: Pt) {
        let target = (self.state.cursor_y + height).min(self.bottom_limit());
        if target > self.state.cursor_y {
            let step = target - self.state.cursor_y;
            self.advance(step);
        }
    }

    pub fn break_page(&mut self, canvas: &mut Canvas) {
        self.close_page(canvas.current_command_count());
        canvas.show_page();
        self.state.page_index += 1;
        self.state.cursor_y = self.top();
    }

    pub fn note_block(&mut self) {
        self.page_blocks += 1;
    }

    pub fn placed_height(&self) -> Pt {
        self.placed_height
    }

    fn close_page(&mut self, command_count: usize) {
        self.pages.push(PageMetrics {
            page_number: self.state.page_index + 1,
            used_height: self.state.cursor_y - self.top(),
            command_count,
            block_count: self.page_blocks,
        });
        self.page_blocks = 0;
    }

    /// Closes the last page and hands back per-page usage.
    pub fn finish(mut self, canvas: &Canvas) -> (Vec<PageMetrics>, Pt) {
        self.close_page(canvas.current_command_count());
        (self.pages, self.placed_height)
    }
}
