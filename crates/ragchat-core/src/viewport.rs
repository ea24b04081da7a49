/// Scroll position of the transcript pane.
///
/// The widget doesn't know how tall its content is once wrapped, so
/// `scroll_to_bottom` only pins the view; the surface calls [`Viewport::resolve`]
/// with real heights when it draws.
#[derive(Debug, Clone)]
pub struct Viewport {
    offset: u16,
    follow: bool,
    scroll_requests: u64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            offset: 0,
            follow: true,
            scroll_requests: 0,
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow = true;
        self.scroll_requests += 1;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow = false;
        self.offset = self.offset.saturating_add(lines);
    }

    /// Clamps the offset to the content and returns it.
    pub fn resolve(&mut self, content_height: u16, view_height: u16) -> u16 {
        let max = content_height.saturating_sub(view_height);
        if self.follow || self.offset >= max {
            self.offset = max;
            self.follow = true;
        }
        self.offset
    }

    pub fn offset(&self) -> u16 {
        self.offset
    }

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// How many times `scroll_to_bottom` has been requested.
    pub fn scroll_requests(&self) -> u64 {
        self.scroll_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_view_tracks_growing_content() {
        let mut viewport = Viewport::new();
        viewport.scroll_to_bottom();
        assert_eq!(viewport.resolve(10, 20), 0);
        assert_eq!(viewport.resolve(30, 20), 10);
        assert_eq!(viewport.resolve(31, 20), 11);
        assert_eq!(viewport.scroll_requests(), 1);
    }

    #[test]
    fn manual_scroll_releases_pin_until_bottom_reached() {
        let mut viewport = Viewport::new();
        viewport.scroll_to_bottom();
        viewport.resolve(50, 10);

        viewport.scroll_up(15);
        assert!(!viewport.is_following());
        assert_eq!(viewport.resolve(60, 10), 25);

        viewport.scroll_down(100);
        assert_eq!(viewport.resolve(60, 10), 50);
        assert!(viewport.is_following());
    }

    #[test]
    fn scroll_to_bottom_repins() {
        let mut viewport = Viewport::new();
        viewport.resolve(40, 10);
        viewport.scroll_up(5);
        viewport.scroll_to_bottom();
        assert_eq!(viewport.resolve(40, 10), 30);
        assert_eq!(viewport.offset(), 30);
    }
}
