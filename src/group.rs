//! Partitions records by the values of a list of attributes.
use itertools::Itertools;

use crate::attribute::{Attribute, GroupKey, Record};
use crate::error::Error;

/// Groups `records` by the values of `attributes`. Groups are sorted by key and
/// records keep their relative order inside a group.
pub fn group_by<'a, R, I>(
    records: I,
    attributes: &[Attribute],
) -> Result<Vec<(GroupKey, Vec<&'a R>)>, Error>
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut keyed = records
        .into_iter()
        .map(|record| (record.key(attributes), record))
        .collect_vec();
    if keyed.is_empty() {
        return Err(Error::EmptyInput);
    }
    // `sort_by` is stable.
    keyed.sort_by(|lhs, rhs| lhs.0.cmp(&rhs.0));
    let groups = keyed
        .into_iter()
        .group_by(|(key, _)| key.clone())
        .into_iter()
        .map(|(key, group)| (key, group.map(|(_, record)| record).collect_vec()))
        .collect_vec();
    Ok(groups)
}
