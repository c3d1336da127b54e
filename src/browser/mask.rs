/// One style rule per mask selector, in the order given.
///
/// Each rule hides matching elements with `visibility: hidden`, which keeps
/// their layout box so the rest of the page does not shift.
pub fn mask_styles(selectors: &[String]) -> Vec<String> {
    selectors
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| format!("{} {{ visibility: hidden !important; }}", s))
        .collect()
}
