//! Generic helper functions.
#[macro_use]
pub mod unwrap;

use fnv::FnvHasher;
use std::hash::BuildHasherDefault;

/// A fast but not secure `Hasher`.
pub type DefaultHasher = BuildHasherDefault<FnvHasher>;
/// An `HashSet` based on `DefaultHasher`.
pub type HashSet<K> = std::collections::HashSet<K, DefaultHasher>;
/// An `HashMap` based on `DefaultHasher`.
pub type HashMap<K, V> = std::collections::HashMap<K, V, DefaultHasher>;

/// Compares two measured times. Panics if one of them is nan: a nan time can only come
/// from a corrupted database and there is no meaningful order to fall back to.
pub fn cmp_f64(a: f64, b: f64) -> std::cmp::Ordering {
    if a.is_nan() || b.is_nan() {
        panic!("Comparing a nan !");
    }

    if (a - b).abs() < std::f64::EPSILON {
        std::cmp::Ordering::Equal
    } else if a < b {
        std::cmp::Ordering::Less
    } else {
        std::cmp::Ordering::Greater
    }
}

/// Returns the index of the first minimum of `values`, or `None` if there is none.
pub fn argmin_f64<I>(values: I) -> Option<usize>
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .enumerate()
        .min_by(|lhs, rhs| cmp_f64(lhs.1, rhs.1))
        .map(|(index, _)| index)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn cmp_f64_orders_times() {
        assert_eq!(cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(cmp_f64(2.0, 1.0), Ordering::Greater);
        assert_eq!(cmp_f64(0.5, 0.5), Ordering::Equal);
    }

    #[test]
    #[should_panic]
    fn cmp_f64_rejects_nan() {
        cmp_f64(std::f64::NAN, 1.0);
    }

    /// Ensures ties are resolved in favour of the first value.
    #[test]
    fn argmin_keeps_first_tie() {
        assert_eq!(argmin_f64(vec![3.0, 1.0, 1.0, 2.0]), Some(1));
        assert_eq!(argmin_f64(Vec::new()), None);
    }

    #[test]
    fn fnv_collections() {
        let mut set = HashSet::default();
        assert!(set.insert("xgemm"));
        assert!(!set.insert("xgemm"));
        let mut map: HashMap<&str, usize> = HashMap::default();
        *map.entry("xgemm").or_insert(0) += 2;
        assert_eq!(map["xgemm"], 2);
    }
}
