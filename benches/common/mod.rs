//! Common utilities for benchmarks.
//!
//! Provides preview-diff generators with fixed seeds for reproducibility.

#![allow(dead_code)]

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Fixed seed for reproducible benchmark data
const SEED: u64 = 42;

/// Create a seeded RNG for reproducible test data
pub fn seeded_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}

/// Generate a multi-file git diff whose hunk headers match their bodies.
///
/// Each file gets `hunks_per_file` hunks of `hunk_len` body lines with a mix of
/// 20% added, 20% removed and 60% context lines.
pub fn generate_preview_diff(files: usize, hunks_per_file: usize, hunk_len: usize) -> String {
    let mut rng = seeded_rng();
    let mut lines = Vec::new();

    for file in 0..files {
        let path = format!("src/module_{}/file_{}.rs", file % 7, file);
        lines.push(format!("diff --git a/{path} b/{path}"));
        lines.push(format!("index {:07x}..{:07x} 100644", file, file + 1));
        lines.push(format!("--- a/{path}"));
        lines.push(format!("+++ b/{path}"));

        let mut old_start = 1u32;
        let mut new_start = 1u32;
        for _ in 0..hunks_per_file {
            let mut body = Vec::with_capacity(hunk_len);
            let (mut old_len, mut new_len) = (0u32, 0u32);
            for i in 0..hunk_len {
                let content = generate_code_line(&mut rng, i);
                match rng.random_range(0..10u8) {
                    0..=1 => {
                        new_len += 1;
                        body.push(format!("+{}", content));
                    }
                    2..=3 => {
                        old_len += 1;
                        body.push(format!("-{}", content));
                    }
                    _ => {
                        old_len += 1;
                        new_len += 1;
                        body.push(format!(" {}", content));
                    }
                }
            }
            lines.push(format!(
                "@@ -{},{} +{},{} @@ fn section()",
                old_start, old_len, new_start, new_len
            ));
            lines.extend(body);

            // leave a gap of unchanged lines between hunks
            old_start += old_len + 20;
            new_start += new_len + 20;
        }
    }

    lines.join("\n")
}

/// Generate a line of realistic Rust-like code
fn generate_code_line(rng: &mut ChaCha8Rng, line_num: usize) -> String {
    let templates = [
        "    let x = value.unwrap_or_default();",
        "    fn process_data(input: &str) -> Result<String> {",
        "    }",
        "    if condition { return Ok(()); }",
        "    for item in items.iter() {",
        "    match result {",
        "        Ok(v) => v,",
        "        Err(e) => return Err(e),",
        "    pub struct Config {",
        "        field: String,",
        "    #[derive(Debug, Clone)]",
        "    /// Documentation comment",
        "    assert_eq!(expected, actual);",
        "    async fn fetch_data() -> Result<Vec<u8>> {",
        "    .map(|x| x * 2)",
    ];

    let idx = rng.random_range(0..templates.len());
    format!("{} // line {}", templates[idx], line_num)
}

/// 1-based diff lines carrying an inline comment, ascending.
pub fn generate_comment_lines(total_lines: usize, comment_density: f64) -> Vec<usize> {
    let mut rng = seeded_rng();
    (1..=total_lines)
        .filter(|_| rng.random::<f64>() < comment_density)
        .collect()
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_generate_preview_diff_shape() {
        let diff = super::generate_preview_diff(3, 2, 10);
        assert_eq!(diff.lines().filter(|l| l.starts_with("diff --git")).count(), 3);
        assert_eq!(diff.lines().count(), 3 * (4 + 2 * 11));
    }

    #[test]
    fn test_generate_preview_diff_reproducible() {
        assert_eq!(
            super::generate_preview_diff(2, 2, 20),
            super::generate_preview_diff(2, 2, 20)
        );
    }

    #[test]
    fn test_generate_comment_lines() {
        let comments = super::generate_comment_lines(100, 0.1);
        // With 10% density on 100 lines, expect roughly 10 comments
        assert!(comments.len() >= 5 && comments.len() <= 20);
        assert!(comments.windows(2).all(|w| w[0] < w[1]));
    }
}
