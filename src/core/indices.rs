use hashbrown::HashMap;

/// Parent key -> child keys, kept sorted.
pub type ChildIndex<P, C> = HashMap<P, Vec<C>>;

/// Inserts `child` under `parent`, keeping the list sorted and free of duplicates.
pub fn insert_child<P, C>(index: &mut ChildIndex<P, C>, parent: P, child: C)
where
    P: std::hash::Hash + Eq,
    C: Ord,
{
    let children = index.entry(parent).or_default();
    if let Err(pos) = children.binary_search(&child) {
        children.insert(pos, child);
    }
}
