/// Converts a completeness ratio (0.0–1.0) into a letter grade.
///
/// | Range       | Grade |
/// |-------------|-------|
/// | >= 0.95     | A+    |
/// | >= 0.90     | A     |
/// | >= 0.80     | B     |
/// | >= 0.65     | C     |
/// | >= 0.40     | D     |
/// | < 0.40      | F     |
pub fn completeness_grade(ratio: f64) -> &'static str {
    match ratio {
        r if r >= 0.95 => "A+",
        r if r >= 0.90 => "A",
        r if r >= 0.80 => "B",
        r if r >= 0.65 => "C",
        r if r >= 0.40 => "D",
        _ => "F",
    }
}
