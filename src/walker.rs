// 🚶 Partition walker - sharded, windowed line iteration
// Cooperating processes pick distinct (modulus, quotient) pairs with a
// shared quotient and each own a disjoint slice of the same huge file

use anyhow::{bail, Result};
use std::io::{self, BufRead};

// ============================================================================
// SHARD FILTER
// ============================================================================

/// Modulo filter over zero-based line ordinals: a line is admitted when
/// `ordinal % quotient == modulus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub modulus: u64,
    pub quotient: u64,
}

impl Shard {
    pub fn new(modulus: u64, quotient: u64) -> Result<Self> {
        if quotient == 0 {
            bail!("shard quotient must be at least 1");
        }
        if modulus >= quotient {
            bail!(
                "shard modulus {} must be smaller than quotient {}",
                modulus,
                quotient
            );
        }
        Ok(Shard { modulus, quotient })
    }

    pub fn admits(&self, ordinal: u64) -> bool {
        ordinal % self.quotient == self.modulus
    }
}

impl Default for Shard {
    /// No sharding: every line is admitted.
    fn default() -> Self {
        Shard {
            modulus: 0,
            quotient: 1,
        }
    }
}

/// Optional offset/length window for resumable or bounded runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Window {
    /// Lines with ordinal below this are skipped before the shard filter.
    pub offset: u64,
    /// Maximum number of admitted lines to emit; `None` = unbounded.
    pub limit: Option<u64>,
}

// ============================================================================
// WALKER
// ============================================================================

/// One admitted line with its zero-based ordinal in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedLine {
    pub ordinal: u64,
    pub text: String,
}

/// Lazy iterator over admitted lines. Finite, not restartable: a fresh
/// walk must reopen the source.
pub struct PartitionWalker<R> {
    lines: io::Lines<R>,
    shard: Shard,
    window: Window,
    next_ordinal: u64,
    admitted: u64,
    done: bool,
}

impl<R: BufRead> PartitionWalker<R> {
    pub fn new(reader: R, shard: Shard, window: Window) -> Self {
        PartitionWalker {
            lines: reader.lines(),
            shard,
            window,
            next_ordinal: 0,
            admitted: 0,
            done: false,
        }
    }

    /// Total lines consumed from the source so far (admitted or not).
    pub fn lines_read(&self) -> u64 {
        self.next_ordinal
    }

    /// Lines emitted so far.
    pub fn lines_admitted(&self) -> u64 {
        self.admitted
    }
}

impl<R: BufRead> Iterator for PartitionWalker<R> {
    type Item = io::Result<AdmittedLine>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(limit) = self.window.limit {
            if self.admitted >= limit {
                self.done = true;
                return None;
            }
        }

        loop {
            let text = match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(text)) => text,
            };

            let ordinal = self.next_ordinal;
            self.next_ordinal += 1;

            if ordinal < self.window.offset {
                continue;
            }
            if !self.shard.admits(ordinal) {
                continue;
            }

            self.admitted += 1;
            return Some(Ok(AdmittedLine { ordinal, text }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::Cursor;

    fn input(n: usize) -> String {
        (0..n).map(|i| format!("line{}\n", i)).collect()
    }

    fn walk(source: &str, shard: Shard, window: Window) -> Vec<u64> {
        PartitionWalker::new(Cursor::new(source.to_string()), shard, window)
            .map(|item| item.unwrap().ordinal)
            .collect()
    }

    #[test]
    fn test_default_shard_admits_every_line() {
        let ordinals = walk(&input(5), Shard::default(), Window::default());
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_shard_moduli_partition_the_file() {
        let source = input(10);
        let quotient = 3;

        let mut union = HashSet::new();
        let mut total = 0;
        for modulus in 0..quotient {
            let shard = Shard::new(modulus, quotient).unwrap();
            let ordinals = walk(&source, shard, Window::default());
            for o in &ordinals {
                assert_eq!(o % quotient, modulus);
            }
            total += ordinals.len();
            union.extend(ordinals);
        }

        // No duplicates and no omissions across the shard set
        assert_eq!(total, 10);
        assert_eq!(union, (0..10).collect::<HashSet<u64>>());
    }

    #[test]
    fn test_offset_skips_leading_lines() {
        let window = Window { offset: 3, limit: None };
        let ordinals = walk(&input(6), Shard::default(), window);
        assert_eq!(ordinals, vec![3, 4, 5]);
    }

    #[test]
    fn test_limit_stops_after_admitted_count() {
        let window = Window { offset: 0, limit: Some(2) };
        let ordinals = walk(&input(6), Shard::default(), window);
        assert_eq!(ordinals, vec![0, 1]);
    }

    #[test]
    fn test_offset_and_limit_compose_with_shard() {
        // Shard 1 mod 2 admits odd ordinals; offset 2 drops 1; limit 2
        // then keeps 3 and 5 only
        let shard = Shard::new(1, 2).unwrap();
        let window = Window { offset: 2, limit: Some(2) };
        let ordinals = walk(&input(10), shard, window);
        assert_eq!(ordinals, vec![3, 5]);
    }

    #[test]
    fn test_lines_read_counts_skipped_lines_too() {
        let shard = Shard::new(0, 4).unwrap();
        let mut walker =
            PartitionWalker::new(Cursor::new(input(9)), shard, Window::default());

        let admitted: Vec<_> = walker.by_ref().map(|i| i.unwrap().ordinal).collect();
        assert_eq!(admitted, vec![0, 4, 8]);
        assert_eq!(walker.lines_read(), 9);
        assert_eq!(walker.lines_admitted(), 3);
    }

    #[test]
    fn test_invalid_shard_parameters() {
        assert!(Shard::new(0, 0).is_err());
        assert!(Shard::new(3, 3).is_err());
        assert!(Shard::new(2, 3).is_ok());
    }
}
