//! File-name canonicalization for generated output files.

/// Characters that are invalid in file names on at least one major platform.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace every forbidden or control character with `_`.
///
/// ```rust
/// use budget_digitizer::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("orçamento 12/2024.json"), "orçamento 12_2024.json");
/// ```
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
