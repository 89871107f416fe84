/// Lowercased alphanumeric runs.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Hashed features with their weights: every token at 1.0, every adjacent
/// token pair at 0.5.
pub fn features(text: &str) -> Vec<(String, f32)> {
    let tokens = tokenize(text);
    let mut out: Vec<(String, f32)> = tokens.iter().map(|t| (t.clone(), 1.0)).collect();
    out.extend(tokens.windows(2).map(|w| (format!("{} {}", w[0], w[1]), 0.5)));
    out
}
