/// Canonical comparison key for a free-text street address.
///
/// Lower-cases the input and turns every character outside `[a-z0-9 ]` into a space;
/// runs of whitespace then collapse to one space and the ends are trimmed. Total over all
/// inputs and idempotent.
pub fn normalize_address(raw: &str) -> String {
    let substituted: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();

    substituted.split_whitespace().collect::<Vec<_>>().join(" ")
}
