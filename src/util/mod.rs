pub mod text_input;
pub mod unicode;

/// Scroll offset that keeps `selected` inside a window of `visible` rows.
pub fn keep_visible(selected: usize, scroll: usize, visible: usize) -> usize {
    if visible == 0 {
        return selected;
    }
    if selected < scroll {
        selected
    } else if selected >= scroll + visible {
        selected + 1 - visible
    } else {
        scroll
    }
}
