/// Lazy subsets of `items`, from the full set down to singletons.
///
/// Within one size subsets come out in lexicographic order of item position,
/// so `[a, b, c]` yields `abc, ab, ac, bc, a, b, c`. Nothing is materialised
/// beyond the current index vector; bound the walk with [`Iterator::take`].
pub struct Combinations<'a, T> {
    items: &'a [T],
    idx: Vec<usize>,
    done: bool,
}

impl<'a, T: Copy> Combinations<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items, idx: (0..items.len()).collect(), done: items.is_empty() }
    }

    fn advance(&mut self) {
        let n = self.items.len();
        let k = self.idx.len();
        let mut i = k;
        while i > 0 {
            i -= 1;
            if self.idx[i] < n - k + i {
                self.idx[i] += 1;
                for j in i + 1..k {
                    self.idx[j] = self.idx[j - 1] + 1;
                }
                return;
            }
        }
        // this size is exhausted, drop to the next smaller one
        if k <= 1 {
            self.done = true;
            return;
        }
        self.idx.truncate(k - 1);
        for (j, slot) in self.idx.iter_mut().enumerate() {
            *slot = j;
        }
    }
}

impl<T: Copy> Iterator for Combinations<'_, T> {
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Vec<T>> {
        if self.done {
            return None;
        }
        let out = self.idx.iter().map(|&i| self.items[i]).collect();
        self.advance();
        Some(out)
    }
}

/// Number of non-empty subsets of an `n`-element set, saturating.
pub fn subset_count(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}
