use crate::Item;

/// Legality authority for triples of items. The protocol never looks
/// inside: it only asks whether a triple scores and whether any triple
/// can still be made from a collection.
pub trait Oracle: Send + Sync {
    fn is_legal_triple(&self, items: [Item; 3]) -> bool;

    /// Used both to validate a fresh deal and to detect game end.
    /// Default is brute force over all combinations, which is fine for
    /// the pool sizes this table is built for.
    fn exists_legal_triple(&self, items: &[Item]) -> bool {
        let n = items.len();
        for i in 0..n {
            for j in i + 1..n {
                for k in j + 1..n {
                    if self.is_legal_triple([items[i], items[j], items[k]]) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// The classic 81-item deck. An item id encodes 4 base-3 features;
/// a triple is legal iff every feature column sums to 0 mod 3, i.e.
/// each feature is all-same or all-different across the three items.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicOracle;

impl ClassicOracle {
    fn feature(item: Item, f: u32) -> usize {
        item / 3usize.pow(f) % 3
    }
}

impl Oracle for ClassicOracle {
    fn is_legal_triple(&self, items: [Item; 3]) -> bool {
        (0..4).all(|f| items.iter().map(|&i| Self::feature(i, f)).sum::<usize>() % 3 == 0)
    }
}
