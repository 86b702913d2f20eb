//! Many-to-many association matrix.

use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// One side of the matrix: key -> partners, remembering key insertion order.
#[derive(Clone)]
struct Adjacency<A, B> {
    lists: HashMap<A, Vec<B>>,
    order: Vec<A>,
}

impl<A, B> Adjacency<A, B>
where
    A: Hash + Eq + Clone,
    B: PartialEq,
{
    fn new() -> Self {
        Self {
            lists: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn get(&self, key: &A) -> Option<&[B]> {
        self.lists.get(key).map(Vec::as_slice)
    }

    /// Appends `partner` to `key`'s list unless already present.
    fn insert(&mut self, key: &A, partner: B) -> bool {
        match self.lists.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().contains(&partner) {
                    return false;
                }
                entry.get_mut().push(partner);
            }
            Entry::Vacant(entry) => {
                entry.insert(vec![partner]);
                self.order.push(key.clone());
            }
        }
        true
    }

    /// Removes `partner` from `key`'s list, dropping the list once empty.
    fn remove(&mut self, key: &A, partner: &B) -> bool {
        let Some(list) = self.lists.get_mut(key) else {
            return false;
        };
        let Some(position) = list.iter().position(|p| p == partner) else {
            return false;
        };
        list.remove(position);
        if list.is_empty() {
            self.remove_key(key);
        }
        true
    }

    fn remove_key(&mut self, key: &A) -> Option<Vec<B>> {
        let list = self.lists.remove(key)?;
        self.order.retain(|k| k != key);
        Some(list)
    }

    fn clear(&mut self) {
        self.lists.clear();
        self.order.clear();
    }

    /// Iterates keys in insertion order with their partners.
    fn iter(&self) -> impl Iterator<Item = (&A, &[B])> {
        self.order
            .iter()
            .filter_map(move |key| self.lists.get(key).map(|list| (key, list.as_slice())))
    }

    fn key_count(&self) -> usize {
        self.lists.len()
    }

    fn pair_count(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }
}

impl<A, B> Adjacency<A, B>
where
    A: Hash + Eq,
    B: Hash + Eq,
{
    /// Order-insensitive view used for equality.
    fn as_sets(&self) -> HashMap<&A, HashSet<&B>> {
        self.lists
            .iter()
            .map(|(key, list)| (key, list.iter().collect()))
            .collect()
    }

    /// Order-insensitive hash of every (key, partner) pair.
    fn pair_hash(&self) -> u64 {
        self.lists
            .iter()
            .flat_map(|(key, list)| list.iter().map(move |partner| (key, partner)))
            .map(|pair| {
                let mut hasher = DefaultHasher::new();
                pair.hash(&mut hasher);
                hasher.finish()
            })
            .fold(0u64, u64::wrapping_add)
    }
}

/// An explicit many-to-many relation between two key domains.
///
/// Keys of the first domain are *columns*, keys of the second are *rows*.
/// The matrix keeps two mirrored adjacency indices, column -> rows and
/// row -> columns; [`add`](Self::add) and [`remove`](Self::remove) keep them
/// in sync so that `row ∈ get_column(column)` iff `column ∈ get_row(row)`.
///
/// [`remove_column`](Self::remove_column) and [`remove_row`](Self::remove_row)
/// only drop the named key's own list and leave the mirrored entries on the
/// other side in place. Use [`purge_column`](Self::purge_column) and
/// [`purge_row`](Self::purge_row) to remove a key from both indices.
///
/// Keys and partners keep their insertion order, which is the order
/// [`get_id_pairs`](Self::get_id_pairs) exports them in.
///
/// # Example
///
/// ```
/// use mmapp_core::BiMap;
///
/// let mut cast = BiMap::new();
/// cast.add("Heat", "Pacino");
/// cast.add("Heat", "De Niro");
/// cast.add("Ronin", "De Niro");
///
/// assert_eq!(cast.get_column(&"Heat"), Some(&["Pacino", "De Niro"][..]));
/// assert_eq!(cast.get_row(&"De Niro"), Some(&["Heat", "Ronin"][..]));
/// ```
#[derive(Clone)]
pub struct BiMap<K1, K2> {
    columns: Adjacency<K1, K2>,
    rows: Adjacency<K2, K1>,
}

impl<K1, K2> BiMap<K1, K2>
where
    K1: Hash + Eq + Clone,
    K2: Hash + Eq + Clone,
{
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: Adjacency::new(),
            rows: Adjacency::new(),
        }
    }

    /// Associates `column` with `row`.
    ///
    /// Returns false if the pair was already present, in which case nothing
    /// changes.
    pub fn add(&mut self, column: K1, row: K2) -> bool {
        let added = self.columns.insert(&column, row.clone());
        let mirrored = self.rows.insert(&row, column);
        added || mirrored
    }

    /// Removes the association between `column` and `row`.
    ///
    /// Returns false if the pair was not present.
    pub fn remove(&mut self, column: &K1, row: &K2) -> bool {
        let removed = self.columns.remove(column, row);
        let mirrored = self.rows.remove(row, column);
        removed || mirrored
    }

    /// Drops `column`'s own list of rows.
    ///
    /// The rows keep listing `column`; callers needing both indices cleaned
    /// remove the pairs first or use [`purge_column`](Self::purge_column).
    pub fn remove_column(&mut self, column: &K1) -> Option<Vec<K2>> {
        self.columns.remove_key(column)
    }

    /// Drops `row`'s own list of columns.
    ///
    /// The columns keep listing `row`; see [`purge_row`](Self::purge_row).
    pub fn remove_row(&mut self, row: &K2) -> Option<Vec<K1>> {
        self.rows.remove_key(row)
    }

    /// Removes `column` and every association it takes part in.
    pub fn purge_column(&mut self, column: &K1) -> Option<Vec<K2>> {
        let rows = self.columns.remove_key(column)?;
        for row in &rows {
            self.rows.remove(row, column);
        }
        Some(rows)
    }

    /// Removes `row` and every association it takes part in.
    pub fn purge_row(&mut self, row: &K2) -> Option<Vec<K1>> {
        let columns = self.rows.remove_key(row)?;
        for column in &columns {
            self.columns.remove(column, row);
        }
        Some(columns)
    }

    /// Removes every association.
    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows.clear();
    }

    /// Returns the rows associated with `column`, in insertion order.
    #[must_use]
    pub fn get_column(&self, column: &K1) -> Option<&[K2]> {
        self.columns.get(column)
    }

    /// Returns the columns associated with `row`, in insertion order.
    #[must_use]
    pub fn get_row(&self, row: &K2) -> Option<&[K1]> {
        self.rows.get(row)
    }

    /// Returns true if `column` is associated with `row`.
    #[must_use]
    pub fn contains(&self, column: &K1, row: &K2) -> bool {
        self.get_column(column)
            .is_some_and(|rows| rows.contains(row))
    }

    /// Returns how many rows `column` is associated with.
    #[must_use]
    pub fn size_of_non_empty_rows(&self, column: &K1) -> usize {
        self.get_column(column).map_or(0, <[K2]>::len)
    }

    /// Returns how many columns `row` is associated with.
    #[must_use]
    pub fn size_of_non_empty_columns(&self, row: &K2) -> usize {
        self.get_row(row).map_or(0, <[K1]>::len)
    }

    /// Iterates columns in insertion order with their rows.
    pub fn columns(&self) -> impl Iterator<Item = (&K1, &[K2])> {
        self.columns.iter()
    }

    /// Iterates rows in insertion order with their columns.
    pub fn rows(&self) -> impl Iterator<Item = (&K2, &[K1])> {
        self.rows.iter()
    }

    /// Returns the number of columns with at least one row.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.key_count()
    }

    /// Returns the number of rows with at least one column.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.key_count()
    }

    /// Returns the number of associations in the column index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.pair_count()
    }

    /// Returns true if neither index holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.key_count() == 0 && self.rows.key_count() == 0
    }

    /// Exports every association as a pair of mapped ids.
    ///
    /// Columns come in insertion order and, within a column, rows come in
    /// the order they were associated.
    pub fn get_id_pairs<A, B, M1, M2>(&self, column_id: M1, row_id: M2) -> Vec<(A, B)>
    where
        M1: Fn(&K1) -> A,
        M2: Fn(&K2) -> B,
    {
        let mut pairs = Vec::with_capacity(self.len());
        for (column, rows) in self.columns.iter() {
            for row in rows {
                pairs.push((column_id(column), row_id(row)));
            }
        }
        pairs
    }
}

impl<K1, K2> Default for BiMap<K1, K2>
where
    K1: Hash + Eq + Clone,
    K2: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K1, K2> FromIterator<(K1, K2)> for BiMap<K1, K2>
where
    K1: Hash + Eq + Clone,
    K2: Hash + Eq + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K1, K2)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (column, row) in iter {
            map.add(column, row);
        }
        map
    }
}

impl<K1, K2> PartialEq for BiMap<K1, K2>
where
    K1: Hash + Eq,
    K2: Hash + Eq,
{
    fn eq(&self, other: &Self) -> bool {
        self.columns.as_sets() == other.columns.as_sets()
            && self.rows.as_sets() == other.rows.as_sets()
    }
}

impl<K1, K2> Eq for BiMap<K1, K2>
where
    K1: Hash + Eq,
    K2: Hash + Eq,
{
}

impl<K1, K2> Hash for BiMap<K1, K2>
where
    K1: Hash + Eq,
    K2: Hash + Eq,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.columns.pair_hash());
        state.write_u64(self.rows.pair_hash());
    }
}

impl<K1: fmt::Debug, K2: fmt::Debug> fmt::Debug for BiMap<K1, K2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiMap")
            .field("columns", &self.columns.lists)
            .field("rows", &self.rows.lists)
            .finish()
    }
}
